use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stmon::api::SyncthingClient;
use stmon::config::{find_config_path, Config, ConfigCredentials};
use stmon::logic::formatting::{format_rate, format_uptime};
use stmon::logic::simulation::{Scenario, SimulationParams};
use stmon::model::syncthing::ConnectionState;
use stmon::model::DataSource;
use stmon::services::{Poller, SystemClock, TracingNotifier};
use stmon::Snapshot;

/// Syncthing status monitor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    debug: bool,

    /// Path to config file (default: platform-specific, see docs)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll interval in seconds, overrides the config file
    #[arg(short, long)]
    interval: Option<u64>,

    /// Show synthetic data: all-synced, mixed-activity or high-throughput
    #[arg(long, value_name = "SCENARIO")]
    simulate: Option<Scenario>,

    /// Number of simulated devices
    #[arg(long, default_value_t = 4)]
    devices: usize,

    /// Number of simulated folders
    #[arg(long, default_value_t = 5)]
    folders: usize,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(cli_path: Option<&PathBuf>) -> Result<Config> {
    let path = find_config_path(cli_path.map(PathBuf::as_path)).map_err(anyhow::Error::msg)?;
    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Config::from_yaml(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => {
            warn!("No config file found, using defaults and environment");
            Config::default()
        }
    };
    config.apply_env_overrides();
    Ok(config)
}

fn status_line(snapshot: &Snapshot) -> String {
    let simulated = snapshot.source == DataSource::Simulated;
    let source = if simulated { " [simulated]" } else { "" };
    match &snapshot.connection_state {
        ConnectionState::Connecting => format!("connecting...{}", source),
        ConnectionState::Disconnected { message, .. } if !simulated => {
            format!("disconnected: {}", message)
        }
        _ => {
            let uptime = snapshot
                .system_status
                .as_ref()
                .map(|s| format_uptime(s.uptime))
                .unwrap_or_else(|| "-".to_string());
            let rate = snapshot.observed.total_rate;
            format!(
                "{:?}{} | {} devices, {} folders | down {} up {} | uptime {}",
                snapshot.summary,
                source,
                snapshot.observed.devices.len(),
                snapshot.observed.folders.len(),
                format_rate(rate.download),
                format_rate(rate.upload),
                uptime,
            )
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let mut config = load_config(args.config.as_ref())?;
    if let Some(secs) = args.interval {
        config.poll_interval_secs = secs;
    }

    let client = SyncthingClient::new().context("Failed to build HTTP client")?;
    let poller = Poller::new(
        Arc::new(client),
        Arc::new(ConfigCredentials::new(&config)),
        Arc::new(TracingNotifier),
        Arc::new(SystemClock),
        config.monitor.clone(),
    );

    if let Some(scenario) = args.simulate {
        poller.enable_simulated(SimulationParams {
            device_count: args.devices,
            folder_count: args.folders,
            scenario,
        });
    }

    let mut updates = poller.subscribe();
    poller.start(config.poll_interval());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                info!("{}", status_line(&snapshot));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    poller.stop();
    Ok(())
}
