//! Conversation sessions and the session store.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use tracing::info;

use super::error::StoreError;

/// A single message within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Store-wide sequence number, assigned at append time.
    pub id: u64,
    /// Who sent the message.
    pub sender: String,
    /// Message body.
    pub text: String,
    /// Capture time, serialized as ISO-8601 UTC with millisecond precision.
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Read-only projection of a session used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
    pub last_message: Option<Message>,
    /// Always `true`; no presence tracking exists.
    pub online: bool,
    /// Display name, or the session id when never renamed.
    pub name: String,
}

/// A single conversation session.
///
/// Sessions hold their messages in arrival order and an optional display
/// name set through [`SessionStore::rename_session`].
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    messages: Vec<Message>,
    display_name: Option<String>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            messages: Vec::new(),
            display_name: None,
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the effective display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Get all messages in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the number of messages in the session.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Get the most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Project the session into a listing entry.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            message_count: self.message_count(),
            last_message: self.last_message().cloned(),
            online: true,
            name: self.name().to_string(),
        }
    }
}

/// Most recent activity first. Sessions without messages go last.
fn by_recency(a: &SessionSummary, b: &SessionSummary) -> CmpOrdering {
    match (&a.last_message, &b.last_message) {
        (Some(left), Some(right)) => right
            .timestamp
            .cmp(&left.timestamp)
            .then_with(|| right.id.cmp(&left.id)),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

/// Fail with a validation error naming every empty field.
fn require(fields: &[(&'static str, &str)]) -> Result<(), StoreError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::missing_fields(&missing))
    }
}

/// Thread-safe store for sessions.
///
/// Cloning the store yields another handle to the same sessions. All
/// operations are serialized by a single lock around the session map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
    /// Last message id handed out. Only advanced under the write lock.
    last_id: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new, empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                last_id: AtomicU64::new(0),
            }),
        }
    }

    // Every mutation leaves the map consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message, creating the session on first use.
    pub fn append_message(
        &self,
        session_id: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Message, StoreError> {
        let session_id = session_id.into();
        let sender = sender.into();
        let text = text.into();
        require(&[
            ("sessionId", session_id.as_str()),
            ("sender", sender.as_str()),
            ("text", text.as_str()),
        ])?;

        let mut guard = self.write();
        let message = Message {
            id: self.inner.last_id.fetch_add(1, Ordering::Relaxed) + 1,
            sender,
            text,
            timestamp: Utc::now(),
        };
        guard
            .entry(session_id.clone())
            .or_insert_with(|| Session::new(session_id.clone()))
            .messages
            .push(message.clone());
        drop(guard);

        info!(
            name: "session.message.appended",
            session_id = %session_id,
            sender = %message.sender,
            message_id = message.id,
            "[{}] {}: {}",
            session_id,
            message.sender,
            message.text
        );
        Ok(message)
    }

    /// List a session's messages in arrival order.
    ///
    /// An unknown session yields an empty list rather than an error.
    pub fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        require(&[("sessionId", session_id)])?;

        Ok(self
            .read()
            .get(session_id)
            .map(|session| session.messages.clone())
            .unwrap_or_default())
    }

    /// Summarize every session, most recently active first.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> =
            self.read().values().map(Session::summary).collect();
        summaries.sort_by(by_recency);
        summaries
    }

    /// Set the display name of an existing session.
    pub fn rename_session(
        &self,
        session_id: &str,
        new_name: impl Into<String>,
    ) -> Result<(), StoreError> {
        let new_name = new_name.into();
        require(&[("sessionId", session_id), ("newName", new_name.as_str())])?;

        let mut guard = self.write();
        let session = guard
            .get_mut(session_id)
            .ok_or_else(|| StoreError::session_not_found(session_id))?;
        session.display_name = Some(new_name.clone());
        drop(guard);

        info!(
            name: "session.renamed",
            session_id = %session_id,
            new_name = %new_name,
            "Session {} renamed to \"{}\"",
            session_id,
            new_name
        );
        Ok(())
    }

    /// Remove a session and all of its messages.
    pub fn delete_session(&self, session_id: &str) -> Result<(), StoreError> {
        require(&[("sessionId", session_id)])?;

        let removed = self
            .write()
            .remove(session_id)
            .ok_or_else(|| StoreError::session_not_found(session_id))?;

        info!(
            name: "session.deleted",
            session_id = %session_id,
            message_count = removed.message_count(),
            "Session deleted: {}",
            session_id
        );
        Ok(())
    }

    /// Get a snapshot of a session by ID.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.read().get(session_id).cloned()
    }

    /// Get the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message_at(id: u64, secs: i64) -> Message {
        Message {
            id,
            sender: "alice".to_string(),
            text: "hi".to_string(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn summary(id: &str, last_message: Option<Message>) -> SessionSummary {
        SessionSummary {
            id: id.to_string(),
            message_count: usize::from(last_message.is_some()),
            last_message,
            online: true,
            name: id.to_string(),
        }
    }

    #[test]
    fn test_two_messages_in_one_session() {
        let store = SessionStore::new();

        let first = store.append_message("s1", "alice", "hi").unwrap();
        let second = store.append_message("s1", "bob", "yo").unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let messages = store.list_messages("s1").unwrap();
        assert_eq!(messages, vec![first, second]);

        let sessions = store.list_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "s1");
        assert_eq!(sessions[0].message_count, 2);
        assert_eq!(sessions[0].last_message.as_ref().unwrap().text, "yo");
        assert!(sessions[0].online);
        assert_eq!(sessions[0].name, "s1");
    }

    #[test]
    fn test_ids_increase_across_sessions() {
        let store = SessionStore::new();
        let mut last = 0;

        for (i, session) in ["a", "b", "a", "c", "b", "a"].iter().enumerate() {
            let message = store
                .append_message(*session, "user", format!("message {i}"))
                .unwrap();
            assert!(message.id > last);
            last = message.id;
        }
        assert_eq!(last, 6);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let store = SessionStore::new();
        store.append_message("s1", "alice", "one").unwrap();
        store.append_message("s1", "alice", "two").unwrap();
        store.delete_session("s1").unwrap();

        let next = store.append_message("s1", "alice", "three").unwrap();
        assert_eq!(next.id, 3);
    }

    #[test]
    fn test_append_validation() {
        let store = SessionStore::new();

        let err = store.append_message("", "alice", "hi").unwrap_err();
        assert_eq!(
            err,
            StoreError::Validation("Missing required fields: sessionId".to_string())
        );

        let err = store.append_message("s1", "", "").unwrap_err();
        assert_eq!(
            err,
            StoreError::Validation("Missing required fields: sender, text".to_string())
        );

        assert!(store.is_empty());
    }

    #[test]
    fn test_list_messages_unknown_session_is_empty() {
        let store = SessionStore::new();
        assert!(store.list_messages("nobody").unwrap().is_empty());
        assert!(matches!(
            store.list_messages(""),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_list_sessions_empty_store() {
        let store = SessionStore::new();
        assert!(store.list_sessions().is_empty());
    }

    #[test]
    fn test_list_sessions_most_recent_first() {
        let store = SessionStore::new();
        store.append_message("old", "alice", "first").unwrap();
        store.append_message("new", "bob", "second").unwrap();
        store.append_message("mid", "carol", "third").unwrap();
        store.append_message("old", "alice", "fourth").unwrap();

        let ids: Vec<String> = store.list_sessions().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["old", "mid", "new"]);
    }

    #[test]
    fn test_recency_order() {
        let mut summaries = vec![
            summary("empty-b", None),
            summary("older", Some(message_at(1, 100))),
            summary("empty-a", None),
            summary("newer", Some(message_at(2, 200))),
            summary("tie-late", Some(message_at(4, 100))),
        ];
        summaries.sort_by(by_recency);

        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "tie-late", "older", "empty-a", "empty-b"]);
    }

    #[test]
    fn test_rename_session() {
        let store = SessionStore::new();
        store.append_message("s1", "alice", "hi").unwrap();
        let before = store.list_messages("s1").unwrap();

        store.rename_session("s1", "Support chat").unwrap();

        let sessions = store.list_sessions();
        assert_eq!(sessions[0].name, "Support chat");
        assert_eq!(sessions[0].id, "s1");
        assert_eq!(store.list_messages("s1").unwrap(), before);
        assert_eq!(store.get("s1").unwrap().name(), "Support chat");
    }

    #[test]
    fn test_rename_missing_session() {
        let store = SessionStore::new();

        let err = store.rename_session("missing", "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.is_empty());

        let err = store.rename_session("missing", "").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_delete_session() {
        let store = SessionStore::new();
        store.append_message("s1", "alice", "hi").unwrap();
        store.append_message("s2", "bob", "yo").unwrap();
        store.rename_session("s1", "renamed").unwrap();

        store.delete_session("s1").unwrap();
        assert!(store.list_messages("s1").unwrap().is_empty());
        assert!(store.list_sessions().iter().all(|s| s.id != "s1"));
        assert_eq!(store.len(), 1);

        store.append_message("s1", "carol", "again").unwrap();
        let session = store.get("s1").unwrap();
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.messages()[0].text, "again");
        assert_eq!(session.name(), "s1");
    }

    #[test]
    fn test_delete_missing_session() {
        let store = SessionStore::new();
        assert!(matches!(
            store.delete_session("missing"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_session(""),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let handle = store.clone();

        handle.append_message("s1", "alice", "hi").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_appends_keep_ids_unique() {
        let store = SessionStore::new();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store
                            .append_message(format!("s{t}"), "worker", format!("{i}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ids: Vec<u64> = (0..4)
            .flat_map(|t| store.list_messages(&format!("s{t}")).unwrap())
            .map(|m| m.id)
            .collect();
        for t in 0..4 {
            let session = store.list_messages(&format!("s{t}")).unwrap();
            assert!(session.windows(2).all(|w| w[0].id < w[1].id));
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(ids.last(), Some(&200));
    }

    #[test]
    fn test_message_serialization() {
        let message = message_at(7, 1_700_000_000);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["sender"], "alice");
        assert_eq!(value["timestamp"], "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn test_summary_serialization() {
        let value = serde_json::to_value(summary("s1", None)).unwrap();
        assert_eq!(value["messageCount"], 0);
        assert!(value["lastMessage"].is_null());
        assert_eq!(value["online"], true);
        assert_eq!(value["name"], "s1");
    }
}
