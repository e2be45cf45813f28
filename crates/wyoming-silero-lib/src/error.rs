//! Error types for wyoming-silero-lib

use thiserror::Error;

use wyoming_silero_core::catalog::CatalogError;
use wyoming_silero_core::config::ConfigError;

/// Server error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or contradictory settings
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model, language or speaker missing from the registry
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// No registry could be downloaded and none is cached
    #[error("model registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Model package download failed
    #[error("download failed: {0}")]
    Download(String),

    /// Engine unreachable or refused to load the model
    #[error("engine error: {0}")]
    Engine(String),

    /// A single synthesis request failed
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Malformed Wyoming event
    #[error("protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
