//! bandbench — automated per-band throughput benchmark for Huawei-class
//! portable routers.
//!
//! Walks the configured band list: restrict the modem to one band, let the
//! radio resettle, measure download/upload/latency, then move on. Ends with
//! a comparison table on stdout and an SVG chart.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bandbench::device::DeviceClient;
use bandbench::measure::{HttpMeasurementEngine, SpeedMeasurer};
use bandbench::orchestrate::Orchestrator;
use bandbench::report;
use bandbench_common::config::RunConfig;

/// Automated LTE band benchmark.
#[derive(Parser, Debug)]
#[command(
    name = "bandbench",
    about = "Switches a modem through its LTE bands and measures each one"
)]
struct Cli {
    /// Path to a TOML run configuration; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device base URL override (e.g. http://192.168.8.1).
    #[arg(long)]
    device_url: Option<String>,

    /// Post-switch settle wait override, in seconds.
    #[arg(long)]
    settle_secs: Option<u64>,

    /// Where to write the comparison chart.
    #[arg(long, default_value = "band_report.svg")]
    chart: PathBuf,

    /// Skip chart rendering.
    #[arg(long, default_value_t = false)]
    no_chart: bool,

    /// Start immediately without the confirmation prompt.
    #[arg(long, default_value_t = false)]
    yes: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(url) = cli.device_url {
        config.device_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = cli.settle_secs {
        config.settle_wait = Duration::from_secs(secs);
    }

    tracing::info!(
        device = %config.device_url,
        bands = config.test_order.len(),
        settle_s = config.settle_wait.as_secs(),
        "bandbench starting"
    );

    println!("Bands to test: {}", config.test_order.join(", "));
    println!("Keep this machine connected to the device for the whole run.");
    if !cli.yes {
        confirm()?;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
        eprintln!("cancelling after the current band...");
    })
    .context("installing ctrl-c handler")?;

    let switcher = DeviceClient::new(&config);
    let measurer = SpeedMeasurer::new(HttpMeasurementEngine::new(&config.measurement));
    let report = Orchestrator::new(config, switcher, measurer, cancel)
        .with_progress(Box::new(|band, phase| {
            tracing::debug!(band = %band, phase = %phase, "phase entered");
        }))
        .run();

    println!("{}", report::render_table(&report));

    if !cli.no_chart {
        match report::render_chart(&report, &cli.chart)? {
            Some(path) => println!("Chart written to {}", path.display()),
            None => println!("No successful measurements; chart skipped."),
        }
    }

    Ok(())
}

/// Blocking Enter-to-start prompt.
fn confirm() -> anyhow::Result<()> {
    print!("Press Enter to start (ctrl-c to abort): ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(())
}
