use thiserror::Error;

/// Transport failures talking to the relay controller.
///
/// These never leave the client: [`crate::DeviceClient`] logs them and
/// reports [`crate::CommandOutcome::Unreachable`] instead.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// TCP connect was refused or the host is unreachable.
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// A connect, send or receive exceeded the configured bound.
    #[error("{stage} timed out after {ms}ms")]
    Timeout { stage: &'static str, ms: u64 },

    /// The controller closed the connection without replying.
    #[error("connection closed before a reply was received")]
    EmptyReply,

    /// Send or receive failed mid-connection (e.g. reset by peer).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
