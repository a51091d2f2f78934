//! Client error types.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] rawpanel_protocol::ProtocolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    ConnectionClosed,

    /// The panel did not deliver its identity fields within the
    /// initialization deadline. Distinct from transport errors: the TCP
    /// connection worked, the panel just never said who it is.
    #[error("panel did not respond to initialization timely")]
    InitTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(ClientError::InitTimeout.to_string().contains("initialization"));
        assert!(ClientError::ConnectionClosed.to_string().contains("closed"));
    }
}
