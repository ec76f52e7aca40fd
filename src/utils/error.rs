use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShareError>;

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Another user has already registered as {0}.")]
    UsernameTaken(String),

    #[error("You have already registered as {0}.")]
    AlreadyRegisteredAs(String),

    #[error("You are not registered as {0}.")]
    NotOwner(String),

    #[error("Unknown session: {0}")]
    UnknownSession(SocketAddr),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ShareError {
    /// Ownership conflicts are answered on the wire and leave the connection open.
    pub fn is_ownership_conflict(&self) -> bool {
        matches!(
            self,
            ShareError::UsernameTaken(_) | ShareError::AlreadyRegisteredAs(_) | ShareError::NotOwner(_)
        )
    }
}

impl From<std::io::Error> for ShareError {
    fn from(err: std::io::Error) -> Self {
        ShareError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ShareError {
    fn from(err: serde_json::Error) -> Self {
        ShareError::SerializationError(err.to_string())
    }
}
