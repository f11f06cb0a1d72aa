use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use perfwatch::{
    generate_report, read_measurements, ChannelListener, Cli, Config, JsonReporter, LogListener,
    OutputFormat, RegressionDetector, RegressionListener, RegressionMonitor, Reporter,
    TerminalReporter,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Regressions buffered between the replay loop and the alert task.
const ALERT_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load config and apply CLI overrides
    let mut config = Config::load_from(cli.config.as_deref())?;
    cli.apply_to_config(&mut config);
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;
    debug!(?config, "Configuration loaded");

    // 1. Load measurements
    let measurements = read_measurements(&cli.input)?;
    info!(
        count = measurements.len(),
        input = %cli.input.display(),
        "Loaded measurements"
    );

    // 2. Replay through the monitor; alerts are logged off the replay path
    let (listener, mut alerts) = ChannelListener::channel(ALERT_QUEUE_CAPACITY);
    let mut monitor = RegressionMonitor::with_detector(RegressionDetector::from_config(&config));
    monitor.add_listener(listener);

    let alert_task = tokio::spawn(async move {
        let mut alerted = 0usize;
        while let Some(result) = alerts.recv().await {
            if let Err(e) = LogListener.on_regression(&result) {
                warn!(error = %e, "Failed to log regression");
            }
            alerted += 1;
        }
        alerted
    });

    for measurement in measurements {
        monitor.add_measurement(measurement);
    }

    // 3. Final verdict for every pair with enough history
    let results = monitor.all_regressions();
    // Dropping the monitor closes the alert channel
    drop(monitor);
    let alerted = alert_task.await.context("Alert task failed")?;
    info!(evaluated = results.len(), alerted, "Replay finished");

    // 4. Report results
    match cli.format {
        OutputFormat::Terminal => TerminalReporter::new().report(&results)?,
        OutputFormat::Json => JsonReporter::new().report(&results)?,
        OutputFormat::Plain => {
            let regressions: Vec<_> = results
                .iter()
                .filter(|r| r.has_regression())
                .cloned()
                .collect();
            print!("{}", generate_report(&regressions));
        }
    }

    if cli.should_fail(results.iter().map(|r| r.severity)) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Log to stderr, filtered by `RUST_LOG`; `RUST_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
