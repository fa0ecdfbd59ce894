//! Relay controller wire format.
//!
//! One plaintext request per TCP connection:
//!
//! | Request              | Reply                                   |
//! |----------------------|-----------------------------------------|
//! | `on 12,13`           | `Done` / `Invalid action` / `Invalid request` |
//! | `off 12`             | same as `on`                            |
//! | `status`             | `12=0;13=1;14=0;16=0;`                  |
//! | `uptime`             | seconds as decimal text                 |

use irrigo_core::{Command, PhysicalId};
use tracing::debug;

/// Classified reply to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    /// `Invalid action` or `Invalid request`.
    Invalid,
    /// Anything else (status payloads, uptime values).
    Payload,
}

/// Build the request line. Switch commands carry the comma-joined
/// physical ids; queries are the bare keyword.
pub fn encode_request(command: Command, physical: &[PhysicalId]) -> String {
    if command.is_switch() {
        let ids: Vec<String> = physical.iter().map(|id| id.to_string()).collect();
        format!("{} {}", command, ids.join(","))
    } else {
        command.as_str().to_string()
    }
}

pub fn classify_reply(reply: &str) -> Reply {
    match reply.trim() {
        "Done" => Reply::Done,
        "Invalid action" | "Invalid request" => Reply::Invalid,
        _ => Reply::Payload,
    }
}

/// Parse a `status` payload into `(physical, open)` pairs.
///
/// Segments without `=` or with non-integer fields are skipped one by one;
/// the rest of the payload is still used.
pub fn parse_status(reply: &str) -> Vec<(PhysicalId, bool)> {
    reply
        .trim()
        .split(';')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let parsed = segment.split_once('=').and_then(|(id, state)| {
                let id = id.trim().parse::<PhysicalId>().ok()?;
                let state = state.trim().parse::<i64>().ok()?;
                Some((id, state != 0))
            });
            if parsed.is_none() {
                debug!(%segment, "skipping malformed status segment");
            }
            parsed
        })
        .collect()
}
