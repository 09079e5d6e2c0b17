//! Playwright browser automation
//!
//! Every iteration plan is rendered into a standalone Node script and run
//! with `node`. One script is one browser context, so cookies and storage
//! never leak between iterations. The secret travels through the child's
//! environment and is referenced from the script as `process.env`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::browser::{Browser, IterationResult, Secret};
use crate::error::{E2eError, E2eResult};
use crate::spec::{FieldValue, IterationPlan, Step};

/// Environment variable the rendered script reads the secret from
const SCRIPT_SECRET_ENV: &str = "NOMNOM_E2E_SECRET";

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s {
            "chromium" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" => Ok(BrowserKind::Webkit),
            other => Err(E2eError::Playwright(format!("Unknown browser: {}", other))),
        }
    }
}

/// Last JSON line the script prints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptReport {
    success: bool,
    #[serde(default)]
    step: usize,
    #[serde(default)]
    step_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    screenshot: Option<String>,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(mut config: PlaywrightConfig) -> E2eResult<Self> {
        // Verify playwright is installed
        Self::check_playwright_installed()?;

        // Scripts run from a temp dir, so the path they write to must be absolute
        config.screenshot_dir = prepare_screenshot_dir(&config.screenshot_dir)?;

        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Build the Playwright script for one iteration
    pub fn build_script(&self, plan: &IterationPlan) -> String {
        build_script(&self.config, plan)
    }

    /// Execute a rendered script via node and parse its report
    async fn run_script(
        &self,
        script: &str,
        secret: Option<&Secret>,
        timeout: Duration,
    ) -> E2eResult<ScriptReport> {
        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("iteration.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new(&self.config.node_binary);
        cmd.arg(&script_path)
            .current_dir(temp_dir.path())
            .kill_on_drop(true);
        if let Some(node_path) = &self.config.node_path {
            cmd.env("NODE_PATH", node_path);
        }
        match secret {
            Some(secret) => cmd.env(SCRIPT_SECRET_ENV, secret.expose()),
            None => cmd.env_remove(SCRIPT_SECRET_ENV),
        };

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(E2eError::ScriptTimeout {
                    after_ms: timeout.as_millis() as u64,
                })
            }
        };
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        match parse_report(&stdout).or_else(|| parse_report(&stderr)) {
            Some(report) => Ok(report),
            None => Err(E2eError::Playwright(format!(
                "Script produced no report (exit {:?}):\nstdout: {}\nstderr: {}",
                output.status.code(),
                stdout,
                stderr
            ))),
        }
    }
}

#[async_trait]
impl Browser for PlaywrightHandle {
    async fn run_iteration(
        &self,
        plan: &IterationPlan,
        secret: Option<&Secret>,
    ) -> E2eResult<IterationResult> {
        if plan.uses_secret() && secret.is_none() {
            return Err(E2eError::Playwright(format!(
                "iteration {} of '{}' fills a secret but none was provided",
                plan.index(),
                plan.flow
            )));
        }

        let start = Instant::now();
        let script = self.build_script(plan);
        let timeout = script_timeout(self.config.step_timeout_ms, plan.steps.len());
        let report = self.run_script(&script, secret, timeout).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        if report.success {
            return Ok(IterationResult::passed(plan.index(), duration_ms));
        }

        let step_name = report
            .step_name
            .or_else(|| plan.steps.get(report.step.saturating_sub(1)).map(Step::name))
            .unwrap_or_else(|| "setup".to_string());
        let error = report.error.unwrap_or_else(|| "unknown error".to_string());
        warn!("Iteration {} failed at {}: {}", plan.index(), step_name, error);

        let mut result =
            IterationResult::failed(plan.index(), duration_ms, report.step, step_name, error);
        result.screenshot_path = report.screenshot;
        Ok(result)
    }
}

/// Create the screenshot directory and return its absolute path
fn prepare_screenshot_dir(dir: &Path) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(std::fs::canonicalize(dir)?)
}

/// Wall-clock budget for one script: every step may use its full timeout,
/// plus two more for browser launch and the failure screenshot
fn script_timeout(step_timeout_ms: u64, steps: usize) -> Duration {
    Duration::from_millis(step_timeout_ms.saturating_mul(steps as u64 + 2))
}

/// Find the last line that parses as a script report
fn parse_report(output: &str) -> Option<ScriptReport> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

/// Quote a value as a JavaScript string literal
fn js_str(value: &str) -> String {
    // A JSON string is a valid JS string literal; the fallback never fires
    // for `&str` input.
    serde_json::to_string(value).unwrap_or_else(|_| "''".to_string())
}

/// Escape `text` so it matches literally inside a JavaScript `RegExp`
fn regex_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '/'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build the Playwright script for one iteration
pub fn build_script(config: &PlaywrightConfig, plan: &IterationPlan) -> String {
    let mut script = String::new();

    let screenshot_path = config.screenshot_dir.join(format!(
        "{}-{}.png",
        plan.flow,
        plan.identity.padded_index()
    ));

    // Header
    script.push_str(&format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext();
  const page = await context.newPage();
  page.setDefaultTimeout({timeout});
  let step = 0;
  let stepName = null;

  try {{
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        timeout = config.step_timeout_ms,
    ));

    // Generate step code
    for (i, step) in plan.steps.iter().enumerate() {
        script.push_str(&format!(
            "\n    // Step {}: {}\n    step = {}; stepName = {};\n",
            i + 1,
            step.name(),
            i + 1,
            js_str(&step.name())
        ));
        script.push_str(&step_to_js(step));
        script.push('\n');
    }

    // Footer
    script.push_str(&format!(
        r#"
    console.log(JSON.stringify({{ success: true }}));
  }} catch (error) {{
    let screenshot = null;
    try {{
      await page.screenshot({{ path: {path}, fullPage: true }});
      screenshot = {path};
    }} catch (_) {{}}
    console.error(JSON.stringify({{ success: false, step, stepName, error: error.message, screenshot }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
        path = js_str(&screenshot_path.to_string_lossy()),
    ));

    script
}

/// Convert a step to JavaScript code
fn step_to_js(step: &Step) -> String {
    match step {
        Step::ClearCookies => "    await context.clearCookies();".to_string(),
        Step::Navigate { url } => {
            format!("    await page.goto({});", js_str(url))
        }
        Step::Click { selector, first } => {
            let pick = if *first { ".first()" } else { "" };
            format!("    await page.locator({}){}.click();", js_str(selector), pick)
        }
        Step::Fill {
            selector,
            value,
            within,
        } => {
            let locator = match within {
                Some(scope) => format!(
                    "page.locator({}).locator({})",
                    js_str(scope),
                    js_str(selector)
                ),
                None => format!("page.locator({})", js_str(selector)),
            };
            let value = match value {
                FieldValue::Text(text) => js_str(text),
                FieldValue::Secret => format!("process.env.{}", SCRIPT_SECRET_ENV),
            };
            format!("    await {}.fill({});", locator, value)
        }
        // The navigation wait is armed before the submit fires
        Step::Submit { form } => format!(
            "    await Promise.all([\n      page.waitForNavigation({{ waitUntil: 'load' }}),\n      page.locator({}).evaluate((f) => f.requestSubmit()),\n    ]);",
            js_str(form)
        ),
        // A string `hasText` ignores case; a RegExp does not
        Step::AssertContains { selector, text } => format!(
            "    await page.locator({}).filter({{ hasText: new RegExp({}) }}).first().waitFor({{ state: 'attached' }});",
            js_str(selector),
            js_str(&regex_literal(text))
        ),
        Step::Log { message } => {
            format!("    console.log('[FLOW] ' + {});", js_str(message))
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub screenshot_dir: PathBuf,
    pub step_timeout_ms: u64,
    pub node_binary: PathBuf,
    /// Directory holding the `playwright` package; exported as `NODE_PATH`
    pub node_path: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            step_timeout_ms: 10_000,
            node_binary: PathBuf::from("node"),
            node_path: std::env::current_dir()
                .ok()
                .map(|dir| dir.join("node_modules")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomnom_common::{Fixture, SiteConfig};
    use test_case::test_case;

    use crate::flows;

    fn plan(flow: &crate::spec::FlowSpec, index: u32) -> IterationPlan {
        let fixture = Fixture {
            email_name: "seed+".to_string(),
            email_domain: "example.org".to_string(),
            name: "Seed".to_string(),
        };
        flow.plan(fixture.identity(index), &SiteConfig::default())
    }

    #[test]
    fn test_login_script_keeps_secret_out() {
        let site = SiteConfig::default();
        let flow = flows::clyde_oauth(&site);
        let script = build_script(&PlaywrightConfig::default(), &plan(&flow, 7));

        assert!(script.contains("await context.clearCookies();"));
        assert!(script.contains(r#"await page.goto("https://nominations.glasgow2024.org");"#));
        assert!(script.contains(r#".fill("seed+007@example.org");"#));
        assert!(script.contains("fill(process.env.NOMNOM_E2E_SECRET)"));
        assert!(script.contains(r#"{ hasText: new RegExp("Seed 007") }"#));
        assert!(script.contains("chromium.launch({ headless: true })"));
    }

    #[test]
    fn test_reset_script_clicks_first_link() {
        let site = SiteConfig::default();
        let flow = flows::password_reset(&site);
        let script = build_script(&PlaywrightConfig::default(), &plan(&flow, 25));

        assert!(script.contains(r#"await page.goto("https://registration.glasgow2024.org/login");"#));
        assert!(script.contains(r#"page.locator(".forgotpassword").first().click();"#));
        assert!(script.contains(r##"page.locator("#reset > form").evaluate((f) => f.requestSubmit()),"##));
        assert!(!script.contains("NOMNOM_E2E_SECRET"));
    }

    #[test]
    fn test_submit_waits_for_the_navigation_it_triggers() {
        let site = SiteConfig::default();
        let flow = flows::clyde_oauth(&site);
        let script = build_script(&PlaywrightConfig::default(), &plan(&flow, 1));

        let submits = script.matches("requestSubmit()").count();
        assert_eq!(submits, 2);
        assert_eq!(script.matches("page.waitForNavigation({ waitUntil: 'load' }),").count(), submits);
        assert!(!script.contains("waitForLoadState"));

        // The wait is registered in the same Promise.all as the submit
        let wait = script.find("waitForNavigation").unwrap();
        let submit = script.find("requestSubmit").unwrap();
        let open = script[..wait].rfind("Promise.all([").unwrap();
        assert!(open < wait && wait < submit);
    }

    #[test]
    fn test_contains_assertion_is_case_sensitive() {
        let step = Step::AssertContains {
            selector: ".navbar".to_string(),
            text: "Test User 042".to_string(),
        };
        let js = step_to_js(&step);
        assert!(js.contains(r#"hasText: new RegExp("Test User 042")"#));
        assert!(!js.contains(r#"hasText: "Test User 042""#));
    }

    #[test_case("nomnom.test+user042@glasgow2024.org", r"nomnom\.test\+user042@glasgow2024\.org")]
    #[test_case("Test User 042", "Test User 042")]
    #[test_case("a(b)[c]{d}|e^f$g*h?i/j", r"a\(b\)\[c\]\{d\}\|e\^f\$g\*h\?i\/j")]
    #[test_case(r"back\slash", r"back\\slash")]
    fn test_regex_literal_escapes_metacharacters(text: &str, expected: &str) {
        assert_eq!(regex_literal(text), expected);
    }

    #[test]
    fn test_screenshot_dir_is_made_absolute() {
        let relative = PathBuf::from(format!("target/screenshot-dir-{}", std::process::id()));
        let resolved = prepare_screenshot_dir(&relative.join("screenshots")).unwrap();

        assert!(resolved.is_absolute());
        assert!(resolved.is_dir());
        assert!(resolved.ends_with("screenshots"));

        let config = PlaywrightConfig {
            screenshot_dir: resolved.clone(),
            ..Default::default()
        };
        let flow = flows::password_reset(&SiteConfig::default());
        let script = build_script(&config, &plan(&flow, 30));
        let expected = js_str(&resolved.join("password-reset-030.png").to_string_lossy());
        assert!(script.contains(&format!("path: {}", expected)));

        std::fs::remove_dir_all(&relative).unwrap();
    }

    #[test]
    fn test_script_timeout_covers_every_step() {
        assert_eq!(script_timeout(10_000, 9), Duration::from_millis(110_000));
        assert_eq!(script_timeout(10_000, 0), Duration::from_millis(20_000));
        assert_eq!(script_timeout(u64::MAX, 3), Duration::from_millis(u64::MAX));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_script_is_killed_after_timeout() {
        let handle = PlaywrightHandle {
            config: PlaywrightConfig {
                node_binary: PathBuf::from("sh"),
                node_path: None,
                ..Default::default()
            },
        };

        let start = Instant::now();
        let err = handle
            .run_script("sleep 30", None, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, E2eError::ScriptTimeout { after_ms: 200 }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str(r#"input[name="email"]"#), r#""input[name=\"email\"]""#);
        assert_eq!(js_str("it's"), r#""it's""#);
    }

    #[test]
    fn test_parse_report_takes_last_json_line() {
        let out = "[FLOW] hello\n{\"success\": true}\n";
        assert!(parse_report(out).unwrap().success);

        let err = "noise\n{\"success\":false,\"step\":3,\"stepName\":\"fill:#x\",\"error\":\"Timeout\",\"screenshot\":null}";
        let report = parse_report(err).unwrap();
        assert!(!report.success);
        assert_eq!(report.step, 3);
        assert_eq!(report.step_name.as_deref(), Some("fill:#x"));
        assert!(parse_report("no json here").is_none());
    }

    #[test_case("chromium", BrowserKind::Chromium)]
    #[test_case("firefox", BrowserKind::Firefox)]
    #[test_case("webkit", BrowserKind::Webkit)]
    fn test_browser_kind_from_str(name: &str, expected: BrowserKind) {
        assert_eq!(name.parse::<BrowserKind>().unwrap(), expected);
        assert_eq!(expected.as_str(), name);
    }

    #[test]
    fn test_unknown_browser_rejected() {
        assert!("netscape".parse::<BrowserKind>().is_err());
    }
}
