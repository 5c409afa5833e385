//! Error types for Cyclecast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CyclecastError>;

#[derive(Error, Debug)]
pub enum CyclecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CyclecastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CyclecastError::InvalidInput(_) => 3,
            CyclecastError::Platform(PlatformError::Authentication(_)) => 2,
            CyclecastError::Platform(_) => 1,
            CyclecastError::Config(_) => 1,
            CyclecastError::Store(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Credentials not found at {0}. Run cycle-setup once to authorize the app")]
    MissingCredentials(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON document '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Document not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),
}
