/// zsock error types
///
/// Transport return codes are turned into typed failures here.

use std::fmt;
use std::io;
use thiserror::Error;

/// A failing transport return code together with its human-readable text.
///
/// This is also the payload of the `error` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Raw return code reported by the transport
    pub code: i32,
    /// Text produced by the transport's `strerror`
    pub description: String,
}

impl TransportError {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (rc {})", self.description, self.code)
    }
}

impl std::error::Error for TransportError {}

/// Main error type for managed socket operations
#[derive(Error, Debug)]
pub enum SocketError {
    /// Transport refused to create the socket
    #[error("Socket creation failed: {0}")]
    Create(TransportError),

    /// Bind returned a negative code
    #[error("Bind failed: {0}")]
    Bind(TransportError),

    /// Connect returned a non-zero code
    #[error("Connect failed: {0}")]
    Connect(TransportError),

    /// Unbind returned a negative code
    #[error("Unbind failed with return code {}: {}", .0.code, .0.description)]
    Unbind(TransportError),

    /// Send returned a negative code
    #[error("Send failed: {0}")]
    Send(TransportError),

    /// Blocking receive faulted; ends the listen loop
    #[error("Receive failed: {0}")]
    Receive(TransportError),

    /// Socket option was rejected
    #[error("Setting socket option failed: {0}")]
    SetOption(TransportError),

    /// Socket option could not be read
    #[error("Reading socket option failed: {0}")]
    GetOption(TransportError),

    /// Socket has been destroyed; its handle is no longer valid
    #[error("Socket destroyed")]
    Destroyed,

    /// A listen loop is already running on this socket
    #[error("Socket is already listening")]
    AlreadyListening,

    /// Worker thread running blocking transport calls is gone
    #[error("Transport worker terminated")]
    WorkerGone,

    /// IO error while spawning worker threads
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for managed socket operations
pub type Result<T> = std::result::Result<T, SocketError>;

impl SocketError {
    /// The transport failure behind this error, if any.
    #[must_use]
    pub const fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Create(e)
            | Self::Bind(e)
            | Self::Connect(e)
            | Self::Unbind(e)
            | Self::Send(e)
            | Self::Receive(e)
            | Self::SetOption(e)
            | Self::GetOption(e) => Some(e),
            _ => None,
        }
    }

    /// Raw transport return code, if this error came from the transport.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        self.transport().map(|e| e.code)
    }

    /// Check if this error originates from a transport return code
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        self.transport().is_some()
    }

    /// Check if the socket can no longer be used after this error
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Destroyed | Self::Receive(_) | Self::WorkerGone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::new(-98, "Address already in use");
        assert_eq!(err.to_string(), "Address already in use (rc -98)");
    }

    #[test]
    fn test_unbind_message_embeds_code() {
        let err = SocketError::Unbind(TransportError::new(-2, "No such file or directory"));
        let msg = err.to_string();
        assert!(msg.contains("-2"), "{msg}");
        assert!(msg.starts_with("Unbind failed with return code"));
    }

    #[test]
    fn test_code_accessor() {
        let err = SocketError::Send(TransportError::new(-11, "Resource temporarily unavailable"));
        assert_eq!(err.code(), Some(-11));
        assert!(err.is_transport_failure());
        assert!(!err.is_terminal());

        assert_eq!(SocketError::Destroyed.code(), None);
        assert!(SocketError::Destroyed.is_terminal());
    }
}
