//! Flow runner: walks a flow's iteration range against a browser backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

use nomnom_common::{Fixture, IterationRange, SiteConfig};

use crate::browser::{Browser, IterationResult, Secret, SECRET_ENV_VAR};
use crate::error::{E2eError, E2eResult};
use crate::spec::FlowSpec;

/// Result of running a single flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub range: IterationRange,
    /// Iterations the range called for
    pub planned: usize,
    /// Iterations actually executed, including a failing one
    pub iterations: Vec<IterationResult>,
    /// Index of the iteration that stopped the run
    pub failed_index: Option<u32>,
    pub error: Option<String>,
}

impl FlowResult {
    pub fn completed(&self) -> usize {
        self.iterations.len()
    }

    fn aborted(name: &str, range: IterationRange, error: String) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            started_at: Utc::now(),
            duration_ms: 0,
            range,
            planned: range.len(),
            iterations: vec![],
            failed_index: None,
            error: Some(error),
        }
    }

    /// The failure as an error, if the flow failed at a step
    pub fn step_error(&self) -> Option<E2eError> {
        let failed = self.iterations.iter().find(|i| !i.success)?;
        Some(E2eError::StepFailed {
            iteration: failed.index,
            step: failed.step_name.clone().unwrap_or_default(),
            reason: failed.error.clone().unwrap_or_default(),
        })
    }
}

/// Result of running several flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<FlowResult>,
}

/// Runs flows against a browser backend
pub struct FlowRunner<B: Browser> {
    browser: B,
    fixture: Fixture,
    site: SiteConfig,
    secret: Option<Secret>,
    output_dir: PathBuf,
}

impl<B: Browser> FlowRunner<B> {
    pub fn new(browser: B, fixture: Fixture, site: SiteConfig) -> Self {
        Self {
            browser,
            fixture,
            site,
            secret: None,
            output_dir: PathBuf::from("test-results"),
        }
    }

    pub fn with_secret(mut self, secret: Option<Secret>) -> Self {
        self.secret = secret;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Fail unless the secret a flow needs is present
    pub fn check_secret(&self, flow: &FlowSpec) -> E2eResult<()> {
        if flow.requires_secret && self.secret.is_none() {
            return Err(E2eError::MissingSecret {
                flow: flow.name.clone(),
                env_var: SECRET_ENV_VAR,
            });
        }
        Ok(())
    }

    /// Run a flow over its whole range
    pub async fn run_flow(&self, flow: &FlowSpec) -> E2eResult<FlowResult> {
        self.run_flow_range(flow, flow.range).await
    }

    /// Run a flow over `range`. Stops at the first failing iteration.
    pub async fn run_flow_range(
        &self,
        flow: &FlowSpec,
        range: IterationRange,
    ) -> E2eResult<FlowResult> {
        self.check_secret(flow)?;

        let started_at = Utc::now();
        let start = Instant::now();
        let mut iterations = Vec::with_capacity(range.len());
        let mut failed_index = None;
        let mut flow_error = None;

        info!("Running {} over {} ({} iterations)", flow.name, range, range.len());

        for index in range {
            let plan = flow.plan(self.fixture.identity(index), &self.site);
            debug!("{} iteration {} as {}", flow.name, index, plan.identity.email);

            // A backend error fails this iteration; the ones before it are kept
            let result = match self.browser.run_iteration(&plan, self.secret.as_ref()).await {
                Ok(result) => result,
                Err(e) => IterationResult::failed(index, 0, 0, "backend".to_string(), e.to_string()),
            };
            let success = result.success;

            if !success {
                error!(
                    "✗ {} iteration {} - {}: {}",
                    flow.name,
                    index,
                    result.step_name.as_deref().unwrap_or("unknown step"),
                    result.error.as_deref().unwrap_or("unknown error")
                );
                failed_index = Some(index);
                flow_error = result.error.clone();
            } else {
                debug!("✓ {} iteration {} ({} ms)", flow.name, index, result.duration_ms);
            }

            iterations.push(result);
            if !success {
                break; // Stop on first failure
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = failed_index.is_none();
        if success {
            info!("✓ {} ({} iterations, {} ms)", flow.name, iterations.len(), duration_ms);
        }

        Ok(FlowResult {
            name: flow.name.clone(),
            success,
            started_at,
            duration_ms,
            range,
            planned: range.len(),
            iterations,
            failed_index,
            error: flow_error,
        })
    }

    /// Run a list of flows. A flow that cannot start is recorded as failed
    /// and the next flow still runs.
    pub async fn run_flows(
        &self,
        flows: &[FlowSpec],
        first: Option<u32>,
        last: Option<u32>,
    ) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} flow(s)...", flows.len());

        for flow in flows {
            let Some(range) = flow.range.clamp(first, last) else {
                info!("Skipping {}: no indices in {} within the requested bounds", flow.name, flow.range);
                continue;
            };

            let result = match self.run_flow_range(flow, range).await {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} - {}", flow.name, e);
                    FlowResult::aborted(&flow.name, range, e.to_string())
                }
            };

            if result.success {
                passed += 1;
            } else {
                failed += 1;
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Flow Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        Ok(SuiteResult {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Write suite results to a JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("flow-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
