/// Errors surfaced by the sync layer to the UI.
///
/// Store operations return these after any rollback has completed, so the
/// caller only decides presentation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Network unreachable or timed out.
    #[error("Network error: {0}")]
    Transport(String),

    /// The remote service answered with a non-success response.
    #[error("{message}")]
    RemoteRejection {
        status: Option<u16>,
        message: String,
    },

    /// Pre-flight check failed; nothing was sent and nothing changed locally.
    #[error("{0}")]
    Validation(String),

    /// A success response whose body could not be parsed.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl SyncError {
    pub fn rejected(message: impl Into<String>) -> Self {
        SyncError::RemoteRejection {
            status: None,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_displays_server_message() {
        let err = SyncError::rejected("Server error");
        assert_eq!(err.to_string(), "Server error");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_display() {
        let err = SyncError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");
        assert!(err.is_transport());
    }
}
