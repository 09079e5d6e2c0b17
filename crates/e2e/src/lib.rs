//! NomNom browser drivers
//!
//! This crate drives the NomNom nomination site and the Clyde registration
//! site through a real browser:
//! - Derives synthetic users from the fixture, one per iteration index
//! - Renders declarative flows into per-iteration plans
//! - Runs each plan in a fresh Playwright browser context
//! - Stops a flow at the first failing iteration and reports it
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FlowRunner<B: Browser>                   │
//! │    ├── check_secret(flow)          (before any navigation)  │
//! │    ├── for index in range:                                  │
//! │    │     plan = flow.plan(fixture.identity(index), site)    │
//! │    │     browser.run_iteration(plan, secret)                │
//! │    └── write_results(suite)                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FlowSpec                                                   │
//! │    ├── name, tags, range, requires_secret                   │
//! │    └── steps: [Step]                                        │
//! │          ├── clear_cookies                                  │
//! │          ├── navigate { url }                               │
//! │          ├── click { selector, first }                      │
//! │          ├── fill { selector, value, within? }              │
//! │          ├── submit { form }                                │
//! │          └── assert_contains { selector, text }             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod error;
pub mod flows;
pub mod playwright;
pub mod preflight;
pub mod runner;
pub mod spec;

pub use browser::{Browser, IterationResult, RecordingBrowser, Secret};
pub use error::{E2eError, E2eResult};
pub use runner::{FlowResult, FlowRunner, SuiteResult};
pub use spec::{FieldValue, FlowSpec, IterationPlan, Step};
