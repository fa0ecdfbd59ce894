//! Action log seam between the device client and the journal that stores it.

use crate::error::Result;
use crate::types::ActionLogEntry;

/// Append-only sink for issued on/off commands.
///
/// The device client calls `record` once per acknowledged switch command.
pub trait ActionSink: Send + Sync {
    fn record(&self, entry: &ActionLogEntry) -> Result<()>;
}
