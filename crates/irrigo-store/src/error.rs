use irrigo_core::IrrigoError;
use thiserror::Error;

/// Errors that can occur within the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column (valve lists) could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `remove_at` was given an index past the end of the schedule.
    #[error("Index {index} out of range (schedule has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

impl From<StoreError> for IrrigoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::IndexOutOfRange { index, .. } => IrrigoError::EntryNotFound { index },
            other => IrrigoError::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
