//! Error types for gauntlet-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by the storage traits
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("session {session_id} is {status}, expected {expected}")]
    InvalidSessionState {
        session_id: String,
        status: String,
        expected: String,
    },

    #[error("layer {layer} is outside 1..=4")]
    InvalidLayer { layer: u8 },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display_names_the_session() {
        let err = StorageError::SessionNotFound {
            session_id: "s-1".to_string(),
        };
        assert!(err.to_string().contains("s-1"));

        let err = StorageError::InvalidSessionState {
            session_id: "s-2".to_string(),
            status: "FAILED".to_string(),
            expected: "active".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("FAILED"));
        assert!(msg.contains("active"));
    }

    #[test]
    fn state_error_converts_into_backend_error() {
        let err: StorageError = StateError::Connection("refused".to_string()).into();
        assert!(matches!(err, StorageError::Backend(msg) if msg.contains("refused")));
    }
}
