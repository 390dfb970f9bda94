use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for loading, validating and provisioning
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration template created at {}", path.display())]
    TemplateCreated { path: PathBuf },

    #[error("Configuration has {} error(s)", errors.len())]
    Validation { errors: Vec<String> },

    #[error("Failed to open serial port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Cancelled by user")]
    Cancelled,

    #[error("Interrupted by user")]
    Interrupted,
}

impl ProvisionError {
    /// True when the run ended because the operator chose to stop
    pub fn is_user_stop(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Interrupted)
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
