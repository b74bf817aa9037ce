//! Errors surfaced by the layer executor.

use gauntlet_core::GauntletError;
use gauntlet_state::{SessionStatus, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid layer {0}: layers are numbered 1 to 4")]
    InvalidLayer(u8),

    #[error("session {session_id} is at layer {current}, cannot execute layer {requested}")]
    OutOfTurn {
        session_id: String,
        current: u8,
        requested: u8,
    },

    #[error("session {session_id} is {status}; reset it before running layers")]
    SessionTerminal {
        session_id: String,
        status: SessionStatus,
    },

    #[error("session {session_id} is {status}; final results exist only once COMPLETED")]
    NotCompleted {
        session_id: String,
        status: SessionStatus,
    },

    /// The layer commit failed. The session has been marked FAILED.
    #[error("failed to persist layer {layer} of session {session_id}: {source}")]
    Persistence {
        session_id: String,
        layer: u8,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Domain(#[from] GauntletError),
}

impl EngineError {
    /// Rejected before any work was done.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidLayer(_)
                | EngineError::OutOfTurn { .. }
                | EngineError::SessionTerminal { .. }
                | EngineError::NotCompleted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_keeps_storage_source() {
        let err = EngineError::Persistence {
            session_id: "s-1".to_string(),
            layer: 2,
            source: StorageError::Backend("disk full".to_string()),
        };
        assert!(err.to_string().contains("layer 2"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_rejection());
    }

    #[test]
    fn out_of_turn_is_a_rejection() {
        let err = EngineError::OutOfTurn {
            session_id: "s-1".to_string(),
            current: 1,
            requested: 3,
        };
        assert!(err.is_rejection());
        assert!(err.to_string().contains("cannot execute layer 3"));
    }
}
