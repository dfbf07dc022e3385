//! Test utilities for device control
//!
//! Provides a scripted in-memory [`Connector`] / [`Transport`] pair. Replies
//! are matched by substring against the issued command; every command is
//! recorded so tests can assert on exactly what was sent to the device.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::stream;

use firetv_core::Endpoint;

use crate::transport::{Connector, ShellStream, Transport, TransportError};

/// A transport failure that can be scripted more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Refused,
    Handshake,
    Corruption,
    Unavailable,
}

impl Fault {
    pub fn to_error(self) -> TransportError {
        match self {
            Fault::Refused => TransportError::ConnectionRefused,
            Fault::Handshake => {
                TransportError::Handshake("Unable to unpack ADB command. <6I".to_string())
            }
            Fault::Corruption => TransportError::Corruption("invalid checksum".to_string()),
            Fault::Unavailable => TransportError::Unavailable("device offline".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Fail(Fault),
}

#[derive(Debug, Clone)]
struct StreamScript {
    pattern: String,
    chunks: Vec<String>,
    trailing_fault: Option<Fault>,
}

#[derive(Debug, Default)]
struct MockState {
    replies: Vec<(String, Reply)>,
    streams: Vec<StreamScript>,
    connect_faults: VecDeque<Fault>,
    commands: Vec<String>,
    connects: usize,
}

/// Scripted connector; clones share the same script and command log
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reply to any command containing `pattern` with `output`
    ///
    /// Later registrations for an identical pattern replace earlier ones.
    pub fn on(&self, pattern: &str, output: &str) -> &Self {
        self.set_reply(pattern, Reply::Output(output.to_string()));
        self
    }

    /// Fail any command containing `pattern`
    pub fn fail_on(&self, pattern: &str, fault: Fault) -> &Self {
        self.set_reply(pattern, Reply::Fail(fault));
        self
    }

    fn set_reply(&self, pattern: &str, reply: Reply) {
        let mut state = self.lock();
        state.replies.retain(|(p, _)| p != pattern);
        state.replies.push((pattern.to_string(), reply));
    }

    /// Stream `chunks` for a streaming command containing `pattern`,
    /// optionally ending with a transport fault
    pub fn stream_on(
        &self,
        pattern: &str,
        chunks: &[&str],
        trailing_fault: Option<Fault>,
    ) -> &Self {
        let mut state = self.lock();
        state.streams.retain(|s| s.pattern != pattern);
        state.streams.push(StreamScript {
            pattern: pattern.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            trailing_fault,
        });
        self
    }

    /// Make the next connection attempt fail
    pub fn fail_next_connect(&self, fault: Fault) {
        self.lock().connect_faults.push_back(fault);
    }

    /// Every command issued through sessions of this connector, in order
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Issued commands containing `needle`
    pub fn commands_matching(&self, needle: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    /// Script a healthy device reporting the given state inputs
    pub fn with_device(
        &self,
        screen_on: bool,
        awake: bool,
        focused_package: &str,
        wake_locks: u32,
    ) -> &Self {
        self.on(
            "Display Power",
            if screen_on {
                "Display Power: state=ON\r\n"
            } else {
                "Display Power: state=OFF\r\n"
            },
        );
        self.on(
            "mWakefulness",
            if awake {
                "  mWakefulness=Awake\r\n"
            } else {
                "  mWakefulness=Dreaming\r\n"
            },
        );
        self.on(
            "mCurrentFocus",
            &format!(
                "  mCurrentFocus=Window{{42ab7c u0 {}/{}.MainActivity}}\r\n",
                focused_package, focused_package
            ),
        );
        self.on("Locks", &format!("Wake Locks: size={}\r\n", wake_locks));
        self
    }
}

impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self, _endpoint: &Endpoint) -> Result<MockSession, TransportError> {
        let mut state = self.lock();
        state.connects += 1;
        if let Some(fault) = state.connect_faults.pop_front() {
            return Err(fault.to_error());
        }
        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

/// Session handed out by [`MockConnector`]
#[derive(Debug, Clone)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MockSession {
    async fn execute(&self, command: &str) -> Result<String, TransportError> {
        let mut state = self.lock();
        state.commands.push(command.to_string());

        let reply = state
            .replies
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Fail(fault)) => Err(fault.to_error()),
            None => Ok(String::new()),
        }
    }

    async fn execute_streaming(&self, command: &str) -> Result<ShellStream, TransportError> {
        let mut state = self.lock();
        state.commands.push(command.to_string());

        let script = state
            .streams
            .iter()
            .find(|s| command.contains(s.pattern.as_str()))
            .cloned();

        let Some(script) = script else {
            return Ok(Box::pin(stream::empty()));
        };

        let mut items: Vec<Result<String, TransportError>> =
            script.chunks.into_iter().map(Ok).collect();
        if let Some(fault) = script.trailing_fault {
            items.push(Err(fault.to_error()));
        }

        Ok(Box::pin(stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_mock_replies_and_records() {
        let mock = MockConnector::new();
        mock.on("dumpsys power", "state=ON");
        let session = mock.connect(&Endpoint::new("tv", 5555)).await.unwrap();

        assert_eq!(session.execute("dumpsys power").await.unwrap(), "state=ON");
        assert_eq!(session.execute("input keyevent 3").await.unwrap(), "");
        assert_eq!(mock.commands(), vec!["dumpsys power", "input keyevent 3"]);
    }

    #[tokio::test]
    async fn test_mock_stream_with_fault() {
        let mock = MockConnector::new();
        mock.stream_on("ps", &["a\n", "b\n"], Some(Fault::Corruption));
        let session = mock.connect(&Endpoint::new("tv", 5555)).await.unwrap();

        let items: Vec<_> = session.execute_streaming("ps").await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert!(matches!(items[2], Err(TransportError::Corruption(_))));
    }

    #[tokio::test]
    async fn test_mock_connect_fault_is_consumed() {
        let mock = MockConnector::new();
        mock.fail_next_connect(Fault::Refused);
        let endpoint = Endpoint::new("tv", 5555);

        assert!(mock.connect(&endpoint).await.is_err());
        assert!(mock.connect(&endpoint).await.is_ok());
        assert_eq!(mock.connect_count(), 2);
    }
}
