use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Address error: {0}")]
    Address(#[from] crate::address::AddressError),

    #[error("Coordination store error: {0}")]
    Coordination(String),

    #[error("Telemetry request error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Instance not found: {app_name}/{host}")]
    NotFound { app_name: String, host: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
