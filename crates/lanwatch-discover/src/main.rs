//! CLI entry point for the lanwatch network monitor.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use lanwatch_discover::config::DiscoverConfig;
use lanwatch_discover::directory::DeviceDirectory;
use lanwatch_discover::notify::{sink_from_config, Notifier};
use lanwatch_discover::present::ConsolePresenter;
use lanwatch_discover::range;
use lanwatch_discover::scanner::ScanEngine;
use lanwatch_discover::scheduler::DiscoveryLoop;

#[derive(Parser)]
#[command(name = "lanwatch")]
#[command(about = "Watch a local /24 for devices joining and leaving")]
struct Cli {
    /// Range to sweep (e.g., 192.168.1.0/24). Overrides config.
    #[arg(short, long)]
    range: Option<String>,

    /// Seconds between scans. Overrides config.
    #[arg(short, long)]
    interval: Option<u64>,

    /// Run a single scan and exit.
    #[arg(long)]
    once: bool,

    /// Config file prefix (default: lanwatch).
    #[arg(short, long, default_value = "lanwatch")]
    config: String,
}

/// How long exit waits on blocking work still in flight (reverse lookups
/// stuck in `getnameinfo`).
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(watch(cli));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn watch(cli: Cli) -> anyhow::Result<()> {
    let mut discover_config = load_discover_config(&cli.config)?;
    if let Some(descriptor) = cli.range {
        discover_config.network_range = descriptor;
    }
    if let Some(interval) = cli.interval {
        discover_config.scan_interval_secs = interval;
    }
    discover_config.validate()?;

    let subnet = range::parse_range(&discover_config.network_range)?;

    let directory = Arc::new(DeviceDirectory::load(
        &discover_config.aliases_path,
        &discover_config.excluded_macs_path,
    ));
    let notifier = Notifier::new(sink_from_config(&discover_config.telegram), directory.clone());
    let presenter = ConsolePresenter::new(directory, discover_config.scan_interval());

    let mut discovery = DiscoveryLoop::new(
        ScanEngine::from_config(&discover_config),
        subnet,
        discover_config.scan_interval(),
    )
    .with_sink(Arc::new(notifier))
    .with_sink(Arc::new(presenter));

    println!("Starting network watch on {subnet}...");
    println!("Scan interval: {} seconds", discover_config.scan_interval_secs);

    if cli.once {
        tokio::select! {
            _ = discovery.run_cycle() => {}
            _ = tokio::signal::ctrl_c() => println!("\nStopping network watch..."),
        }
        return Ok(());
    }

    tokio::select! {
        _ = discovery.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for interrupt");
            }
            println!("\nStopping network watch...");
        }
    }

    Ok(())
}

fn load_discover_config(file_prefix: &str) -> anyhow::Result<DiscoverConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("LANWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<DiscoverConfig>("discover") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(DiscoverConfig::default()),
        Err(e) => Err(e.into()),
    }
}
