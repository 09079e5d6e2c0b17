//! The browser seam: anything that can execute one iteration plan in a
//! fresh session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

use crate::error::{E2eError, E2eResult};
use crate::spec::{IterationPlan, Step};

/// Environment variable the CLI reads the Clyde password from
pub const SECRET_ENV_VAR: &str = "CLYDE_PASSWORD";

/// A secret value typed into password fields. `Debug` never prints it.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Outcome of one iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationResult {
    pub index: u32,
    pub success: bool,
    pub duration_ms: u64,
    /// 1-based position of the failing step
    pub failed_step: Option<usize>,
    pub step_name: Option<String>,
    pub error: Option<String>,
    pub screenshot_path: Option<String>,
}

impl IterationResult {
    pub fn passed(index: u32, duration_ms: u64) -> Self {
        Self {
            index,
            success: true,
            duration_ms,
            failed_step: None,
            step_name: None,
            error: None,
            screenshot_path: None,
        }
    }

    pub fn failed(index: u32, duration_ms: u64, step: usize, step_name: String, error: String) -> Self {
        Self {
            index,
            success: false,
            duration_ms,
            failed_step: Some(step),
            step_name: Some(step_name),
            error: Some(error),
            screenshot_path: None,
        }
    }
}

/// Executes iteration plans
///
/// Each call runs in its own browser session: nothing from a previous
/// iteration may be observable. Step failures are reported in the returned
/// [`IterationResult`]; `Err` is reserved for the backend itself breaking.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn run_iteration(
        &self,
        plan: &IterationPlan,
        secret: Option<&Secret>,
    ) -> E2eResult<IterationResult>;
}

/// A browser that executes nothing and records every plan it is handed.
/// Used by `--dry-run` and in tests.
#[derive(Debug, Default)]
pub struct RecordingBrowser {
    plans: Mutex<Vec<IterationPlan>>,
    fail_at: Option<(u32, usize)>,
    /// Iteration whose backend call returns an error instead of a result
    error_at: Option<u32>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a failure at `step` (1-based) of iteration `index`
    pub fn failing_at(index: u32, step: usize) -> Self {
        Self {
            plans: Mutex::new(Vec::new()),
            fail_at: Some((index, step)),
            error_at: None,
        }
    }

    /// Return a backend error, as a crashed browser would, at iteration `index`
    pub fn erroring_at(index: u32) -> Self {
        Self {
            error_at: Some(index),
            ..Self::default()
        }
    }

    /// Plans received so far, in order
    pub fn plans(&self) -> Vec<IterationPlan> {
        self.plans.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Every step received so far, flattened
    pub fn steps(&self) -> Vec<Step> {
        self.plans().into_iter().flat_map(|p| p.steps).collect()
    }
}

#[async_trait]
impl Browser for RecordingBrowser {
    async fn run_iteration(
        &self,
        plan: &IterationPlan,
        _secret: Option<&Secret>,
    ) -> E2eResult<IterationResult> {
        if let Ok(mut plans) = self.plans.lock() {
            plans.push(plan.clone());
        }

        if self.error_at == Some(plan.index()) {
            return Err(E2eError::Playwright("simulated backend error".to_string()));
        }

        match self.fail_at {
            Some((index, step)) if index == plan.index() => {
                let name = plan
                    .steps
                    .get(step.saturating_sub(1))
                    .map(Step::name)
                    .unwrap_or_else(|| format!("step {}", step));
                Ok(IterationResult::failed(
                    index,
                    0,
                    step,
                    name,
                    "simulated failure".to_string(),
                ))
            }
            _ => Ok(IterationResult::passed(plan.index(), 0)),
        }
    }
}
