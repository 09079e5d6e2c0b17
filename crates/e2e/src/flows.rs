//! Built-in flows
//!
//! Both flows are built from the site configuration so selectors and URLs
//! can be overridden without touching code.

use nomnom_common::{IterationRange, SiteConfig};

use crate::spec::{FieldValue, FlowSpec, Step};

pub const CLYDE_OAUTH: &str = "clyde-oauth";
pub const PASSWORD_RESET: &str = "password-reset";

/// Log in to NomNom through Clyde as each synthetic user and check the
/// navbar greets them by name.
pub fn clyde_oauth(site: &SiteConfig) -> FlowSpec {
    let s = &site.selectors;
    FlowSpec {
        name: CLYDE_OAUTH.to_string(),
        description: "Log in to the nominations site through Clyde OAuth".to_string(),
        tags: vec!["auth".to_string(), "oauth".to_string()],
        range: IterationRange::login(),
        requires_secret: true,
        steps: vec![
            Step::ClearCookies,
            Step::Navigate {
                url: "{nominations_url}".to_string(),
            },
            Step::Click {
                selector: s.clyde_login_button.clone(),
                first: false,
            },
            Step::Fill {
                within: Some(s.login_form.clone()),
                selector: s.username_field.clone(),
                value: FieldValue::Text("{email}".to_string()),
            },
            Step::Fill {
                within: Some(s.login_form.clone()),
                selector: s.password_field.clone(),
                value: FieldValue::Secret,
            },
            Step::Submit {
                form: s.login_form.clone(),
            },
            // Account selection page lists the registrant's email
            Step::AssertContains {
                selector: s.account_email.clone(),
                text: "{email}".to_string(),
            },
            Step::Submit {
                form: s.account_confirm_form.clone(),
            },
            Step::AssertContains {
                selector: s.navbar_user_button.clone(),
                text: "{display_name}".to_string(),
            },
        ],
    }
}

/// Request a password reset for each synthetic user. Seeds reset emails;
/// nothing is asserted after submission.
pub fn password_reset(site: &SiteConfig) -> FlowSpec {
    let s = &site.selectors;
    FlowSpec {
        name: PASSWORD_RESET.to_string(),
        description: "Request a password reset on the registration site".to_string(),
        tags: vec!["auth".to_string(), "seed".to_string()],
        range: IterationRange::password_reset(),
        requires_secret: false,
        steps: vec![
            Step::ClearCookies,
            Step::Navigate {
                url: "{login_url}".to_string(),
            },
            Step::Click {
                selector: s.forgot_password_link.clone(),
                first: true,
            },
            Step::Fill {
                within: Some(s.reset_form.clone()),
                selector: s.reset_email_field.clone(),
                value: FieldValue::Text("{email}".to_string()),
            },
            Step::Submit {
                form: s.reset_form.clone(),
            },
        ],
    }
}

/// All built-in flows
pub fn builtin(site: &SiteConfig) -> Vec<FlowSpec> {
    vec![clyde_oauth(site), password_reset(site)]
}
