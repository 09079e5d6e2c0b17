//! Error types for the shared NomNom types

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("Invalid iteration range: first {first} is after last {last}")]
    InvalidRange { first: u32, last: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
