//! Session and message storage.
//!
//! This module provides in-memory session storage for the relay. Sessions are
//! keyed by caller-chosen identifiers, created on the first message and kept
//! until they are explicitly deleted.
//!
//! # Architecture
//!
//! - [`Session`]: A single conversation thread and its messages
//! - [`SessionStore`]: Thread-safe store for all live sessions
//! - [`StoreError`]: Validation and lookup failures
//!
//! # Example
//!
//! ```rust
//! use chat_relay::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let message = store.append_message("s1", "alice", "Hello!").unwrap();
//! assert_eq!(message.id, 1);
//!
//! let messages = store.list_messages("s1").unwrap();
//! assert_eq!(messages.len(), 1);
//! ```

mod error;
mod store;

pub use error::StoreError;
pub use store::{Message, Session, SessionStore, SessionSummary};
