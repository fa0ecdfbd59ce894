use thiserror::Error;

#[derive(Debug, Error)]
pub enum IrrigoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid schedule entry: {0}")]
    InvalidEntry(String),

    #[error("Unknown valve: {id}")]
    UnknownValve { id: u32 },

    #[error("Schedule entry not found at index {index}")]
    EntryNotFound { index: usize },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IrrigoError {
    /// Short error code string returned to console clients.
    pub fn code(&self) -> &'static str {
        match self {
            IrrigoError::Config(_) => "CONFIG_ERROR",
            IrrigoError::InvalidEntry(_) => "INVALID_ENTRY",
            IrrigoError::UnknownValve { .. } => "UNKNOWN_VALVE",
            IrrigoError::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            IrrigoError::Database(_) => "DATABASE_ERROR",
            IrrigoError::Device(_) => "DEVICE_ERROR",
            IrrigoError::Serialization(_) => "SERIALIZATION_ERROR",
            IrrigoError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, IrrigoError>;
