//! On-demand valve status, reconciled from physical channels to logical ids.

use std::collections::BTreeMap;
use std::sync::Arc;

use irrigo_core::{Command, SharedRegistry, ValveId, ValveRegistry};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::{CommandOutcome, ValveDriver};
use crate::protocol::parse_status;

/// Logical valve id → open. A missing id means "unknown", not "closed".
pub type ValveStatusSnapshot = BTreeMap<ValveId, bool>;

/// One status query: whether the controller answered, and what it reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReading {
    pub reachable: bool,
    pub valves: ValveStatusSnapshot,
}

pub struct StatusSynchronizer {
    driver: Arc<dyn ValveDriver>,
    registry: SharedRegistry,
}

impl StatusSynchronizer {
    pub fn new(driver: Arc<dyn ValveDriver>, registry: SharedRegistry) -> Self {
        Self { driver, registry }
    }

    /// Ask the controller for its channel states. Empty when it cannot be reached.
    pub async fn query(&self) -> ValveStatusSnapshot {
        self.read().await.valves
    }

    /// Like [`query`](Self::query), but keeps whether the controller answered
    /// apart from an answer that maps to no known valve.
    pub async fn read(&self) -> StatusReading {
        match self.driver.send_command(Command::Status, &[]).await {
            CommandOutcome::Acknowledged { reply: Some(text) } => {
                let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
                StatusReading {
                    reachable: true,
                    valves: reconcile(&registry, &text),
                }
            }
            other => {
                warn!(?other, "status query returned no data");
                StatusReading::default()
            }
        }
    }
}

/// Map a raw `status` payload onto logical valve ids.
///
/// Channels with no logical valve in the registry are dropped.
pub fn reconcile(registry: &ValveRegistry, reply: &str) -> ValveStatusSnapshot {
    let mut snapshot = ValveStatusSnapshot::new();
    for (physical, open) in parse_status(reply) {
        match registry.logical_for(physical) {
            Some(id) => {
                snapshot.insert(id, open);
            }
            None => debug!(physical, "status for unmapped channel ignored"),
        }
    }
    snapshot
}
