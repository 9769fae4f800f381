//! Errors returned by the session store.

use thiserror::Error;

/// Failures surfaced by [`SessionStore`](super::SessionStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A required field was missing or empty.
    #[error("{0}")]
    Validation(String),

    /// The referenced session does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl StoreError {
    /// Build a validation error listing the missing fields.
    pub(crate) fn missing_fields(fields: &[&str]) -> Self {
        Self::Validation(format!("Missing required fields: {}", fields.join(", ")))
    }

    pub(crate) fn session_not_found(id: &str) -> Self {
        Self::NotFound(format!("Session '{id}' not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message() {
        let err = StoreError::missing_fields(&["sender", "text"]);
        assert_eq!(err.to_string(), "Missing required fields: sender, text");
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::session_not_found("abc");
        assert_eq!(err, StoreError::NotFound("Session 'abc' not found".to_string()));
    }
}
