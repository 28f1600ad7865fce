//! Error types for RakshakIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// RakshakIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire document serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration or store file parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration or store file encode error
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// Network link not established
    #[error("Network link down, request aborted")]
    Offline,

    /// Required setting missing from store or config
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    /// Operation not supported
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
