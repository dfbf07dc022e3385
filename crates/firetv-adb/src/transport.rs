//! Transport seam between the device engine and whatever carries adb traffic

use std::future::Future;
use std::time::Duration;

use futures_util::stream::BoxStream;
use thiserror::Error;

use firetv_core::Endpoint;

/// Output of a streaming command, delivered in fragments of arbitrary size
pub type ShellStream = BoxStream<'static, Result<String, TransportError>>;

/// Failures raised by a transport session
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device actively refused the connection
    #[error("connection refused")]
    ConnectionRefused,

    /// The handshake could not be decoded
    #[error("malformed handshake: {0}")]
    Handshake(String),

    /// The link failed its integrity check mid-operation
    #[error("transport corrupted: {0}")]
    Corruption(String),

    /// The device dropped off or is not attached to the adb server
    #[error("device unavailable: {0}")]
    Unavailable(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("adb binary not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Command(String),
}

impl TransportError {
    pub fn is_corruption(&self) -> bool {
        matches!(self, TransportError::Corruption(_))
    }
}

/// Shell access to one connected device
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Run a command and return everything it printed
    async fn execute(&self, command: &str) -> Result<String, TransportError>;

    /// Start a command whose output is consumed as it arrives
    async fn execute_streaming(&self, command: &str) -> Result<ShellStream, TransportError>;
}

/// Opens sessions to device endpoints
pub trait Connector: Send + Sync {
    type Session: Transport + Sync + 'static;

    fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Self::Session, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_corruption_is_corruption() {
        assert!(TransportError::Corruption("checksum".into()).is_corruption());
        assert!(!TransportError::ConnectionRefused.is_corruption());
        assert!(!TransportError::Handshake("bad".into()).is_corruption());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "command timed out after 3s");
    }
}
