//! NomNom browser drivers - CLI entry point
//!
//! Run with: nomnom-e2e --flow clyde-oauth --password ... (or CLYDE_PASSWORD)

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nomnom_common::{Fixture, SiteConfig};
use nomnom_e2e::browser::{Browser, RecordingBrowser, Secret, SECRET_ENV_VAR};
use nomnom_e2e::playwright::{BrowserKind, PlaywrightConfig, PlaywrightHandle};
use nomnom_e2e::{flows, preflight, E2eError, FlowRunner, FlowSpec};

#[derive(Parser, Debug)]
#[command(name = "nomnom-e2e")]
#[command(author, version, about = "Browser drivers for the NomNom login and password-reset flows")]
struct Args {
    /// Run only these flows (default: all built-in flows)
    #[arg(short, long)]
    flow: Vec<String>,

    /// Run only flows carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Directory of additional YAML flow specs
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// User fixture file
    #[arg(long, default_value_os_t = nomnom_common::default_fixture_path())]
    fixture: PathBuf,

    /// Site configuration file (defaults apply when missing)
    #[arg(short, long, default_value_os_t = nomnom_common::default_config_path())]
    config: PathBuf,

    /// Clyde password for the synthetic users
    #[arg(long, env = SECRET_ENV_VAR, hide_env_values = true)]
    password: Option<String>,

    /// Skip indices below this one
    #[arg(long)]
    first: Option<u32>,

    /// Skip indices above this one
    #[arg(long)]
    last: Option<u32>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Directory containing the playwright node package
    #[arg(long)]
    node_path: Option<PathBuf>,

    /// Check the target sites respond before starting
    #[arg(long)]
    preflight: bool,

    /// Render plans without launching a browser
    #[arg(long)]
    dry_run: bool,

    /// List the selected flows and exit
    #[arg(long)]
    list: bool,

    /// Write the effective site configuration to --config and exit
    #[arg(long)]
    write_config: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<bool> {
    let site = SiteConfig::load(&args.config)?;
    if args.write_config {
        write_config(&site, &args.config)?;
        return Ok(true);
    }

    let selected = select_flows(&args, &site)?;

    if args.list {
        for flow in &selected {
            println!(
                "{:<20} {:<12} {}{}",
                flow.name,
                flow.range.to_string(),
                flow.description,
                if flow.requires_secret { " (needs password)" } else { "" }
            );
        }
        return Ok(true);
    }

    let fixture = Fixture::load(&args.fixture)?;
    let secret = args.password.clone().map(Secret::new);

    if args.dry_run {
        let runner = FlowRunner::new(RecordingBrowser::new(), fixture, site)
            .with_secret(secret)
            .with_output_dir(args.output.clone());
        return run(&runner, &selected, &args, true).await;
    }

    if args.preflight {
        let urls = vec![site.nominations_url.clone(), site.login_url()];
        preflight::check_all(&urls, Duration::from_secs(30)).await?;
    }

    let playwright = PlaywrightHandle::new(PlaywrightConfig {
        browser: args.browser.parse::<BrowserKind>()?,
        headless: !args.headed,
        screenshot_dir: args.output.join("screenshots"),
        step_timeout_ms: site.step_timeout_ms,
        node_path: args
            .node_path
            .clone()
            .or_else(|| PlaywrightConfig::default().node_path),
        ..Default::default()
    })?;

    let runner = FlowRunner::new(playwright, fixture, site)
        .with_secret(secret)
        .with_output_dir(args.output.clone());
    run(&runner, &selected, &args, false).await
}

async fn run<B: Browser>(
    runner: &FlowRunner<B>,
    flows: &[FlowSpec],
    args: &Args,
    dry_run: bool,
) -> anyhow::Result<bool> {
    // Missing secrets are a setup error: fail before the first navigation
    for flow in flows {
        runner.check_secret(flow)?;
    }

    let suite = runner.run_flows(flows, args.first, args.last).await?;
    runner.write_results(&suite)?;

    if dry_run {
        for result in &suite.results {
            println!("{}: {} iteration(s) planned", result.name, result.completed());
        }
    }

    for result in suite.results.iter().filter(|r| !r.success) {
        match result.step_error() {
            Some(e) => eprintln!("{}: {}", result.name, e),
            None => eprintln!(
                "{}: {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    Ok(suite.failed == 0)
}

/// Save `site` with every default filled in, so it can be edited
fn write_config(site: &SiteConfig, path: &Path) -> anyhow::Result<()> {
    site.save(path)?;
    tracing::info!("Wrote site config to {}", path.display());
    Ok(())
}

fn select_flows(args: &Args, site: &SiteConfig) -> anyhow::Result<Vec<FlowSpec>> {
    let mut available = flows::builtin(site);
    if let Some(dir) = &args.specs {
        available.extend(FlowSpec::load_all(dir)?);
    }

    let mut selected = if args.flow.is_empty() {
        available
    } else {
        let mut picked = Vec::new();
        for name in &args.flow {
            let flow = available
                .iter()
                .find(|f| &f.name == name)
                .cloned()
                .ok_or_else(|| E2eError::FlowNotFound(name.clone()))?;
            picked.push(flow);
        }
        picked
    };

    if let Some(tag) = &args.tag {
        selected = FlowSpec::filter_by_tag(&selected, tag)
            .into_iter()
            .cloned()
            .collect();
    }

    Ok(selected)
}
