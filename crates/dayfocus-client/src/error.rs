//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The server could not be reached or the request did not complete.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server has no session for us.
    #[error("not signed in")]
    NotAuthenticated,

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The server's body was not what we expected.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Sign-in or sign-out could not be started or completed.
    #[error("connect error: {0}")]
    Connect(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Connection("request timed out".to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = ClientError::Status {
            status: 500,
            message: "Failed to fetch calendar events".into(),
        };
        assert_eq!(
            err.to_string(),
            "server returned 500: Failed to fetch calendar events"
        );
        assert_eq!(ClientError::NotAuthenticated.to_string(), "not signed in");
    }
}
