//! Error types for the browser drivers

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Missing secret: flow '{flow}' needs a password (pass --password or set {env_var})")]
    MissingSecret { flow: String, env_var: &'static str },

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Playwright script timed out after {after_ms} ms")]
    ScriptTimeout { after_ms: u64 },

    #[error("Flow spec parse error: {0}")]
    SpecParse(String),

    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    #[error("Iteration {iteration} failed at step {step} - {reason}")]
    StepFailed {
        iteration: u32,
        step: String,
        reason: String,
    },

    #[error("Site unreachable: {url} after {attempts} attempts")]
    Unreachable { url: String, attempts: usize },

    #[error(transparent)]
    Common(#[from] nomnom_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
