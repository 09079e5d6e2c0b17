//! Site configuration: target URLs, timeouts and the DOM selectors the
//! drivers consume.
//!
//! Every field has a default matching the live Glasgow 2024 sites, so a
//! missing config file is not an error.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Site configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Nomination site (NomNom) base URL
    pub nominations_url: String,

    /// Registration site (Clyde) base URL
    pub registration_url: String,

    /// Login page path on the registration site
    pub login_path: String,

    /// Per-step timeout handed to the browser engine
    pub step_timeout_ms: u64,

    /// DOM selectors
    pub selectors: Selectors,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            nominations_url: "https://nominations.glasgow2024.org".to_string(),
            registration_url: "https://registration.glasgow2024.org".to_string(),
            login_path: "/login".to_string(),
            step_timeout_ms: 10_000,
            selectors: Selectors::default(),
        }
    }
}

/// Selectors for externally owned markup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// "Login with Clyde" button on the nominations landing page. The
    /// button carries no id, hence the long path.
    pub clyde_login_button: String,

    /// Clyde login form
    pub login_form: String,
    pub username_field: String,
    pub password_field: String,

    /// Registrant shown on the account selection page
    pub account_email: String,

    /// Form that confirms the selected account
    pub account_confirm_form: String,

    /// Logout button in the navbar, labelled with the display name
    pub navbar_user_button: String,

    /// Forgot-password link on the registration login page
    pub forgot_password_link: String,

    /// Password reset form and its email field
    pub reset_form: String,
    pub reset_email_field: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            clyde_login_button: "main.main-block.flex-shrink-0 div.container-fluid div.flex-row \
                div.d-flex.justify-content-center.align-items-center.bd-highlight div.d-flex \
                div.p-5.text-center.bg-body-tertiary div.container.py-5 div.d-inline-flex.gap-2.mb-5 \
                a button.d-inline-flex.align-items-center.btn.btn-primary.btn-lg.px-4.rounded-pill"
                .to_string(),
            login_form: "#login > form".to_string(),
            username_field: r#"input[name="username"]"#.to_string(),
            password_field: r#"input[name="password"]"#.to_string(),
            account_email: ".text-muted".to_string(),
            account_confirm_form: ".product-card form".to_string(),
            navbar_user_button: "#navbarContent > .navbar-nav > .nav-item > form > .btn".to_string(),
            forgot_password_link: ".forgotpassword".to_string(),
            reset_form: "#reset > form".to_string(),
            reset_email_field: r#"input[name="email"]"#.to_string(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from file, falling back to defaults when the file
    /// does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            tracing::debug!("Loaded site config from {}", path.display());
            Ok(config)
        } else {
            tracing::debug!("No site config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (field, url) in [
            ("nominations_url", &self.nominations_url),
            ("registration_url", &self.registration_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "{field} must start with http:// or https://, got '{url}'"
                )));
            }
        }
        if !self.login_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "login_path must start with '/', got '{}'",
                self.login_path
            )));
        }
        if self.step_timeout_ms == 0 {
            return Err(Error::InvalidConfig("step_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Full URL of the registration login page
    pub fn login_url(&self) -> String {
        format!(
            "{}{}",
            self.registration_url.trim_end_matches('/'),
            self.login_path
        )
    }
}
