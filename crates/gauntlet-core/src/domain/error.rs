//! Domain-level error taxonomy for Gauntlet.

/// Errors produced while probing a source repository.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoCheckError {
    #[error("unrecognized repository URL: {0}")]
    InvalidUrl(String),

    #[error("repository host request failed: {0}")]
    Http(String),

    #[error("repository host answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("repository check timed out")]
    Timeout,
}

/// Gauntlet domain errors.
#[derive(Debug, thiserror::Error)]
pub enum GauntletError {
    #[error("invalid layer {0}: layers are numbered 1 to 4")]
    InvalidLayer(u8),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("repository check failed: {0}")]
    RepoCheck(#[from] RepoCheckError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Gauntlet domain operations.
pub type Result<T> = std::result::Result<T, GauntletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_layer_display() {
        let err = GauntletError::InvalidLayer(7);
        assert!(err.to_string().contains("invalid layer 7"));
    }

    #[test]
    fn test_repo_check_error_converts() {
        let err: GauntletError = RepoCheckError::UnexpectedStatus(503).into();
        let msg = err.to_string();
        assert!(msg.contains("repository check failed"));
        assert!(msg.contains("503"));
    }
}
