//! Error types for voxmix.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MixError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Source corpus errors
    #[error("Corrupt source recording {key}: {message}")]
    DataIntegrity { key: String, message: String },

    #[error("Catalog has {found} eligible speaker(s), need at least 2")]
    CatalogTooSmall { found: usize },

    // Remote store errors
    #[error("Remote store operation failed for {key}: {message}")]
    RemoteUnavailable { key: String, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MixError>;
