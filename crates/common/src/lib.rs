//! NomNom Common Library
//!
//! Shared types for the NomNom browser drivers: the user fixture, the
//! synthetic identities derived from it, iteration ranges and the site
//! configuration (URLs and DOM selectors).

pub mod config;
pub mod error;
pub mod identity;

// Re-export commonly used types
pub use config::{Selectors, SiteConfig};
pub use error::{Error, Result};
pub use identity::{
    Fixture, IterationRange, SyntheticIdentity, FIRST_RESET_ELIGIBLE_INDEX, LAST_INDEX,
    LOGIN_FIRST_INDEX,
};

/// Default location of the user fixture, relative to the working directory
pub fn default_fixture_path() -> std::path::PathBuf {
    std::path::PathBuf::from("fixtures").join("users.json")
}

/// Default location of the optional site configuration file
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from("nomnom-e2e.toml")
}
