//! Session lifetime for a single device
//!
//! A [`Connection`] holds at most one transport session. A refused connection
//! leaves it empty without raising an error; callers treat an empty
//! connection as a disconnected device. After a corrupted transfer the
//! session is dropped and re-established exactly once, and the interrupted
//! operation is still reported as failed.

use firetv_core::prelude::*;
use firetv_core::Endpoint;

use crate::transport::{Connector, TransportError};

/// Result of a connection attempt that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// The device refused the connection; it is simply not reachable right now
    Unreachable,
}

/// Owns the transport session for one endpoint
pub struct Connection<C: Connector> {
    endpoint: Endpoint,
    connector: C,
    session: Option<C::Session>,
}

impl<C: Connector> std::fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl<C: Connector> Connection<C> {
    /// Create a connection without contacting the device
    pub fn new(endpoint: Endpoint, connector: C) -> Self {
        Self {
            endpoint,
            connector,
            session: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// The live session, if any. Never attempts to reconnect.
    pub fn current_session(&self) -> Option<&C::Session> {
        self.session.as_ref()
    }

    /// (Re)open the session, replacing any existing one
    ///
    /// # Errors
    ///
    /// - [`Error::MultiSessionConflict`] when the handshake looks like the
    ///   device is wedged by several simultaneous adb connections.
    /// - Any other transport failure, converted by [`transport_error`].
    pub async fn connect(&mut self) -> Result<ConnectOutcome> {
        debug!("Connecting to device \"{}\"", self.endpoint);
        self.session = None;

        match self.connector.connect(&self.endpoint).await {
            Ok(session) => {
                debug!("adb connection to {} successful", self.endpoint);
                self.session = Some(session);
                Ok(ConnectOutcome::Connected)
            }
            Err(TransportError::ConnectionRefused) => {
                info!("Device {} refused the connection", self.endpoint);
                Ok(ConnectOutcome::Unreachable)
            }
            Err(TransportError::Handshake(detail)) => {
                error!(
                    "Reboot \"{}\" Fire TV, it has multiple adb connections ({})",
                    self.endpoint, detail
                );
                Err(Error::multi_session_conflict(self.endpoint.to_string()))
            }
            Err(e) => Err(transport_error(&self.endpoint, "connect", e)),
        }
    }

    /// Drop the corrupted session and connect once more
    ///
    /// The outcome is only informational: the operation that hit the
    /// corruption fails regardless.
    pub async fn reconnect_after_corruption(&mut self) -> Result<ConnectOutcome> {
        warn!(
            "Transport to {} failed its integrity check, reconnecting",
            self.endpoint
        );
        self.disconnect();
        self.connect().await
    }

    /// Forget the current session
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            debug!("Dropped session to {}", self.endpoint);
        }
    }
}

/// Convert a transport failure during `operation` into an application error
pub fn transport_error(endpoint: &Endpoint, operation: &str, err: TransportError) -> Error {
    match err {
        TransportError::Corruption(_) => Error::transport_corruption(endpoint.to_string()),
        TransportError::Handshake(_) => Error::multi_session_conflict(endpoint.to_string()),
        TransportError::NotFound => Error::AdbNotFound,
        TransportError::Timeout(limit) => Error::Timeout {
            command: operation.to_string(),
            seconds: limit.as_secs(),
        },
        TransportError::Io(e) => Error::Io(e),
        other => Error::transport(format!("{} on {}: {}", operation, endpoint, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Fault, MockConnector};
    use std::time::Duration;

    fn endpoint() -> Endpoint {
        Endpoint::new("192.168.1.20", 5555)
    }

    #[tokio::test]
    async fn test_connect_success() {
        let mock = MockConnector::new();
        let mut conn = Connection::new(endpoint(), mock.clone());

        assert!(!conn.is_connected());
        assert_eq!(conn.connect().await.unwrap(), ConnectOutcome::Connected);
        assert!(conn.is_connected());
        assert_eq!(mock.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_refused_is_unreachable() {
        let mock = MockConnector::new();
        mock.fail_next_connect(Fault::Refused);
        let mut conn = Connection::new(endpoint(), mock);

        assert_eq!(conn.connect().await.unwrap(), ConnectOutcome::Unreachable);
        assert!(conn.current_session().is_none());
    }

    #[tokio::test]
    async fn test_connect_handshake_is_multi_session_conflict() {
        let mock = MockConnector::new();
        mock.fail_next_connect(Fault::Handshake);
        let mut conn = Connection::new(endpoint(), mock);

        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, Error::MultiSessionConflict { .. }));
        assert!(err.to_string().contains("reboot"));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_connect_other_failure_propagates() {
        let mock = MockConnector::new();
        mock.fail_next_connect(Fault::Unavailable);
        let mut conn = Connection::new(endpoint(), mock);

        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }

    #[tokio::test]
    async fn test_reconnect_after_corruption_connects_once() {
        let mock = MockConnector::new();
        let mut conn = Connection::new(endpoint(), mock.clone());
        conn.connect().await.unwrap();

        let outcome = conn.reconnect_after_corruption().await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(mock.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_reconnect_refused_leaves_disconnected() {
        let mock = MockConnector::new();
        let mut conn = Connection::new(endpoint(), mock.clone());
        conn.connect().await.unwrap();

        mock.fail_next_connect(Fault::Refused);
        let outcome = conn.reconnect_after_corruption().await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Unreachable);
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_transport_error_mapping() {
        let ep = endpoint();

        let err = transport_error(&ep, "ps", TransportError::Corruption("crc".into()));
        assert!(matches!(err, Error::TransportCorruption { .. }));
        assert!(err.is_recoverable());

        let err = transport_error(&ep, "ps", TransportError::Timeout(Duration::from_secs(10)));
        assert!(matches!(err, Error::Timeout { seconds: 10, .. }));

        let err = transport_error(&ep, "ps", TransportError::NotFound);
        assert!(matches!(err, Error::AdbNotFound));

        let err = transport_error(&ep, "ps", TransportError::Unavailable("offline".into()));
        assert!(err.to_string().contains("192.168.1.20:5555"));
    }
}
