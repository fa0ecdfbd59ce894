use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use irrigo_core::config::{DeviceConfig, STATUS_RECV_LIMIT};
use irrigo_core::{ActionLogEntry, ActionSink, Command, PhysicalId, SharedRegistry, ValveId};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::error::{DeviceError, Result};
use crate::protocol::{classify_reply, encode_request, Reply};

/// What happened to a command. Transport failures never escape as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The request was delivered. `reply` is the controller's answer when
    /// one arrived within the timeout.
    Acknowledged { reply: Option<String> },
    /// The controller answered `Invalid action` / `Invalid request`, or the
    /// command was refused before sending.
    Rejected { reply: String },
    /// Connect, send or receive failed.
    Unreachable { reason: String },
}

impl CommandOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, CommandOutcome::Acknowledged { .. })
    }

    /// Reply payload of an acknowledged command.
    pub fn reply(&self) -> Option<&str> {
        match self {
            CommandOutcome::Acknowledged { reply } => reply.as_deref(),
            _ => None,
        }
    }
}

/// Anything that can switch valves and answer queries.
///
/// Implemented by [`DeviceClient`]; the scheduler and status synchroniser
/// only see this trait so they can be driven by a fake in tests.
#[async_trait]
pub trait ValveDriver: Send + Sync {
    async fn send_command(&self, command: Command, valves: &[ValveId]) -> CommandOutcome;

    /// Controller uptime in seconds, as reported.
    async fn uptime(&self) -> Option<String> {
        self.send_command(Command::Uptime, &[])
            .await
            .reply()
            .map(|r| r.trim().to_string())
    }
}

/// One-shot TCP client for the relay controller.
///
/// Opens a fresh connection per command and never reuses it; the controller
/// closes after a single reply.
pub struct DeviceClient {
    address: String,
    timeout: Duration,
    registry: SharedRegistry,
    actions: Arc<dyn ActionSink>,
}

impl DeviceClient {
    pub fn new(config: &DeviceConfig, registry: SharedRegistry, actions: Arc<dyn ActionSink>) -> Self {
        Self {
            address: config.address(),
            timeout: Duration::from_millis(config.timeout_ms),
            registry,
            actions,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn resolve(&self, valves: &[ValveId]) -> Vec<PhysicalId> {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        valves.iter().map(|v| registry.resolve_physical(*v)).collect()
    }

    fn ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Connect, send `request`, then read at most one frame.
    ///
    /// Queries must get a reply. For switch commands the send is what
    /// counts; a missing reply is not an error.
    async fn exchange(&self, request: &str, reply_required: bool) -> Result<Option<String>> {
        let mut stream = timeout(self.timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| DeviceError::Timeout {
                stage: "connect",
                ms: self.ms(),
            })?
            .map_err(|source| DeviceError::Connect {
                address: self.address.clone(),
                source,
            })?;

        timeout(self.timeout, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| DeviceError::Timeout {
                stage: "send",
                ms: self.ms(),
            })??;

        let mut buf = vec![0u8; STATUS_RECV_LIMIT];
        let read = timeout(self.timeout, stream.read(&mut buf)).await;
        match read {
            Ok(Ok(n)) if n > 0 => Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned())),
            Ok(Ok(_)) if reply_required => Err(DeviceError::EmptyReply),
            Ok(Err(e)) if reply_required => Err(DeviceError::Io(e)),
            Err(_) if reply_required => Err(DeviceError::Timeout {
                stage: "receive",
                ms: self.ms(),
            }),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ValveDriver for DeviceClient {
    async fn send_command(&self, command: Command, valves: &[ValveId]) -> CommandOutcome {
        if command.is_switch() && valves.is_empty() {
            warn!(%command, "switch command with no valves, not sent");
            return CommandOutcome::Rejected {
                reply: "no valves selected".to_string(),
            };
        }

        let request = encode_request(command, &self.resolve(valves));
        let reply = match self.exchange(&request, !command.is_switch()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(%request, address = %self.address, error = %e, "device command failed");
                return CommandOutcome::Unreachable {
                    reason: e.to_string(),
                };
            }
        };
        info!(%request, ?valves, "command sent");

        if let Some(text) = reply.as_deref() {
            if classify_reply(text) == Reply::Invalid {
                warn!(%request, reply = %text.trim(), "controller rejected command");
                return CommandOutcome::Rejected {
                    reply: text.trim().to_string(),
                };
            }
        }

        if command.is_switch() {
            if let Err(e) = self.actions.record(&ActionLogEntry::now(command, valves)) {
                error!(%request, error = %e, "failed to append action log");
            }
        }

        CommandOutcome::Acknowledged { reply }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irrigo_core::ValveRegistry;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<ActionLogEntry>>);

    impl ActionSink for RecordingSink {
        fn record(&self, entry: &ActionLogEntry) -> irrigo_core::Result<()> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    /// Minimal stand-in for the relay firmware: one request per connection.
    async fn fake_controller(status: &'static str) -> (u16, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                let (mut conn, _) = match listener.accept().await {
                    Ok(c) => c,
                    Err(_) => return,
                };
                let mut buf = [0u8; 1024];
                let n = conn.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let parts: Vec<&str> = request.split_whitespace().collect();
                let reply = match parts.as_slice() {
                    ["on" | "off", _] => "Done".to_string(),
                    [_, _] => "Invalid action".to_string(),
                    ["status"] => status.to_string(),
                    ["uptime"] => "1234.5".to_string(),
                    _ => "Invalid request".to_string(),
                };
                let _ = tx.send(request);
                let _ = conn.write_all(reply.as_bytes()).await;
            }
        });
        (port, rx)
    }

    fn client(port: u16, sink: Arc<RecordingSink>) -> DeviceClient {
        let mut registry = ValveRegistry::new();
        registry.set_mapping(1, 16);
        registry.set_mapping(2, 14);
        let config = DeviceConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout_ms: 500,
        };
        DeviceClient::new(&config, registry.into_shared(), sink)
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn on_command_uses_physical_ids_and_logs_action() {
        let (port, mut requests) = fake_controller("").await;
        let sink = Arc::new(RecordingSink::default());
        let client = client(port, sink.clone());

        let outcome = client.send_command(Command::On, &[1, 2, 3]).await;
        assert!(outcome.is_acknowledged());
        assert_eq!(requests.recv().await.unwrap(), "on 16,14,3");

        let log = sink.0.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, Command::On);
        assert_eq!(log[0].valves, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn status_returns_reply_without_logging() {
        let (port, _requests) = fake_controller("12=1;16=0;").await;
        let sink = Arc::new(RecordingSink::default());
        let client = client(port, sink.clone());

        let outcome = client.send_command(Command::Status, &[]).await;
        assert_eq!(outcome.reply(), Some("12=1;16=0;"));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn uptime_is_trimmed_text() {
        let (port, _requests) = fake_controller("").await;
        let client = client(port, Arc::new(RecordingSink::default()));
        assert_eq!(client.uptime().await.as_deref(), Some("1234.5"));
    }

    #[tokio::test]
    async fn unreachable_controller_is_reported_not_raised() {
        let port = closed_port().await;
        let sink = Arc::new(RecordingSink::default());
        let client = client(port, sink.clone());

        let outcome = client.send_command(Command::Off, &[1]).await;
        assert!(matches!(outcome, CommandOutcome::Unreachable { .. }));
        assert_eq!(outcome.reply(), None);
        assert!(sink.0.lock().unwrap().is_empty());

        let status = client.send_command(Command::Status, &[]).await;
        assert!(matches!(status, CommandOutcome::Unreachable { .. }));
    }

    #[tokio::test]
    async fn empty_switch_command_is_rejected_locally() {
        let port = closed_port().await;
        let client = client(port, Arc::new(RecordingSink::default()));
        let outcome = client.send_command(Command::On, &[]).await;
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn silent_controller_times_out_on_query() {
        // Accepts but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_conn, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let client = client(port, Arc::new(RecordingSink::default()));
        let outcome = client.send_command(Command::Status, &[]).await;
        match outcome {
            CommandOutcome::Unreachable { reason } => assert!(reason.contains("receive timed out")),
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }
}
