//! Declarative flow specification
//!
//! A flow is a list of step templates walked once per synthetic identity in
//! its iteration range. Templates may reference `{email}`, `{display_name}`,
//! `{index}` and the site URLs; they are rendered into an [`IterationPlan`]
//! before the browser sees them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use nomnom_common::{IterationRange, SiteConfig, SyntheticIdentity};

use crate::error::{E2eError, E2eResult};

/// Placeholders a step template may use
pub const PLACEHOLDERS: &[&str] = &[
    "email",
    "display_name",
    "index",
    "nominations_url",
    "registration_url",
    "login_url",
];

/// A complete flow specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    /// Unique name for this flow
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering flows
    #[serde(default)]
    pub tags: Vec<String>,

    /// Indices walked, inclusive on both ends
    pub range: IterationRange,

    /// Whether the flow fills a secret; checked before the first iteration
    #[serde(default)]
    pub requires_secret: bool,

    /// Steps executed, in order, for every index
    pub steps: Vec<Step>,
}

/// A single browser step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Drop every cookie so no session leaks into the next iteration
    ClearCookies,

    /// Navigate to an absolute URL
    Navigate { url: String },

    /// Click an element
    Click {
        selector: String,
        /// Click the first match instead of requiring a unique one
        #[serde(default)]
        first: bool,
    },

    /// Fill an input, optionally scoped to a container such as a form
    Fill {
        selector: String,
        value: FieldValue,
        #[serde(default)]
        within: Option<String>,
    },

    /// Submit a form
    Submit { form: String },

    /// Assert at least one element matching `selector` contains `text`
    AssertContains { selector: String, text: String },

    /// Log a message (for debugging)
    Log { message: String },
}

/// Value typed into a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Literal text, may contain placeholders
    Text(String),

    /// The run's secret. Never rendered into scripts or logs.
    Secret,
}

impl Step {
    /// Short name used in logs and reports. Never includes field values.
    pub fn name(&self) -> String {
        match self {
            Step::ClearCookies => "clear_cookies".to_string(),
            Step::Navigate { url } => format!("navigate:{}", url),
            Step::Click { selector, .. } => format!("click:{}", selector),
            Step::Fill {
                selector, within, ..
            } => match within {
                Some(scope) => format!("fill:{} {}", scope, selector),
                None => format!("fill:{}", selector),
            },
            Step::Submit { form } => format!("submit:{}", form),
            Step::AssertContains { selector, .. } => format!("assert_contains:{}", selector),
            Step::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }

    /// Whether this step navigates the browser
    pub fn is_navigation(&self) -> bool {
        matches!(self, Step::Navigate { .. })
    }

    fn render(&self, vars: &TemplateVars) -> Step {
        let r = |s: &String| vars.render(s);
        match self {
            Step::ClearCookies => Step::ClearCookies,
            Step::Navigate { url } => Step::Navigate { url: r(url) },
            Step::Click { selector, first } => Step::Click {
                selector: r(selector),
                first: *first,
            },
            Step::Fill {
                selector,
                value,
                within,
            } => Step::Fill {
                selector: r(selector),
                value: match value {
                    FieldValue::Text(text) => FieldValue::Text(r(text)),
                    FieldValue::Secret => FieldValue::Secret,
                },
                within: within.as_ref().map(r),
            },
            Step::Submit { form } => Step::Submit { form: r(form) },
            Step::AssertContains { selector, text } => Step::AssertContains {
                selector: r(selector),
                text: r(text),
            },
            Step::Log { message } => Step::Log { message: r(message) },
        }
    }

    fn template_strings(&self) -> Vec<&str> {
        match self {
            Step::ClearCookies => vec![],
            Step::Navigate { url } => vec![url.as_str()],
            Step::Click { selector, .. } => vec![selector.as_str()],
            Step::Fill {
                selector,
                value,
                within,
            } => {
                let mut out = vec![selector.as_str()];
                if let FieldValue::Text(text) = value {
                    out.push(text.as_str());
                }
                if let Some(scope) = within {
                    out.push(scope.as_str());
                }
                out
            }
            Step::Submit { form } => vec![form.as_str()],
            Step::AssertContains { selector, text } => vec![selector.as_str(), text.as_str()],
            Step::Log { message } => vec![message.as_str()],
        }
    }
}

/// Values substituted into step templates for one iteration
#[derive(Debug, Clone)]
pub struct TemplateVars {
    pairs: Vec<(&'static str, String)>,
}

impl TemplateVars {
    pub fn new(identity: &SyntheticIdentity, site: &SiteConfig) -> Self {
        Self {
            pairs: vec![
                ("email", identity.email.clone()),
                ("display_name", identity.display_name.clone()),
                ("index", identity.padded_index()),
                ("nominations_url", site.nominations_url.clone()),
                ("registration_url", site.registration_url.clone()),
                ("login_url", site.login_url()),
            ],
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replace every known `{placeholder}` in `template` in a single pass.
    /// Substituted values are never scanned again, so a fixture value that
    /// itself contains `{index}` stays literal.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}').and_then(|close| Some((close, self.get(&after[..close])?))) {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// The concrete steps for one identity
#[derive(Debug, Clone)]
pub struct IterationPlan {
    pub flow: String,
    pub identity: SyntheticIdentity,
    pub steps: Vec<Step>,
}

impl IterationPlan {
    pub fn index(&self) -> u32 {
        self.identity.index
    }

    /// Whether any step types the secret
    pub fn uses_secret(&self) -> bool {
        self.steps.iter().any(|s| {
            matches!(
                s,
                Step::Fill {
                    value: FieldValue::Secret,
                    ..
                }
            )
        })
    }
}

impl FlowSpec {
    /// Parse a flow spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a flow spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all flow specs from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Check the spec is internally consistent
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("flow name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("flow '{}' has no steps", self.name)));
        }

        let fills_secret = self.steps.iter().any(|s| {
            matches!(
                s,
                Step::Fill {
                    value: FieldValue::Secret,
                    ..
                }
            )
        });
        if fills_secret && !self.requires_secret {
            return Err(E2eError::SpecParse(format!(
                "flow '{}' fills a secret but does not set requires_secret",
                self.name
            )));
        }

        for step in &self.steps {
            for template in step.template_strings() {
                if let Some(unknown) = unknown_placeholder(template) {
                    return Err(E2eError::SpecParse(format!(
                        "flow '{}' step {} uses unknown placeholder {{{}}}",
                        self.name,
                        step.name(),
                        unknown
                    )));
                }
            }
        }
        Ok(())
    }

    /// Render the steps for one identity
    pub fn plan(&self, identity: SyntheticIdentity, site: &SiteConfig) -> IterationPlan {
        let vars = TemplateVars::new(&identity, site);
        IterationPlan {
            flow: self.name.clone(),
            steps: self.steps.iter().map(|s| s.render(&vars)).collect(),
            identity,
        }
    }
}

/// Find the first `{word}` token that is not a known placeholder.
/// CSS selectors never contain bare braces, so any brace pair is a
/// placeholder candidate.
fn unknown_placeholder(template: &str) -> Option<String> {
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return None;
        };
        let name = &after[..close];
        let is_identifier = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_identifier && !PLACEHOLDERS.contains(&name) {
            return Some(name.to_string());
        }
        rest = &after[close + 1..];
    }
    None
}
