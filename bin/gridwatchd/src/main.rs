//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "binary"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Binary entrypoint for the GridWatch daemon."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use gridwatch_api::{spawn_api_server, ApiServer, ApiState};
use gridwatch_common::config::{AppConfig, Mode};
use gridwatch_common::logging::init_tracing;
use gridwatch_common::version::VersionInfo;
use gridwatch_core::runtime::MonitorRuntime;
use gridwatch_metrics::{new_registry, spawn_http_server, DaemonMetrics, MonitorMetrics};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    version = concat!("GridWatch ", env!("CARGO_PKG_VERSION")),
    about = "GridWatch daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[arg(long, value_enum, help = "Override application mode")]
    mode: Option<CliMode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Production,
    Simulation,
}

impl From<CliMode> for Mode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Production => Mode::Production,
            CliMode::Simulation => Mode::Simulation,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the monitoring daemon")]
    Run,
    #[command(about = "Validate the configuration and exit")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.dev.toml"));
    candidates.push(PathBuf::from("configs/example.prod.toml"));

    let load_started = Instant::now();
    let loaded_config = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded_config.config;
    let config_path = loaded_config.source;
    let load_duration = load_started.elapsed();

    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing("gridwatchd", &config.logging)?;
            info!(config_path = %config_path.display(), "configuration loaded");
            run_daemon(config, load_duration.as_secs_f64(), version).await?;
        }
        Commands::CheckConfig => {
            config.validate()?;
            println!(
                "Configuration OK: {} ({} poles)",
                config_path.display(),
                config.poles.len()
            );
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig, config_load_seconds: f64, version: VersionInfo) -> Result<()> {
    let metrics_settings = config.metrics.clone();
    let api_settings = config.api.clone();
    let mode = config.mode;

    let registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(registry.clone())?;
    daemon_metrics.observe_config_load(config_load_seconds);
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(&version.semver, &version.profile);

    let (monitor_metrics, metrics_server) = if metrics_settings.enabled {
        let monitor_metrics = MonitorMetrics::new(registry.clone())?;
        info!(address = %metrics_settings.listen, "metrics exporter enabled");
        let server = spawn_http_server(registry.clone(), metrics_settings.listen)?;
        (Some(monitor_metrics), Some(server))
    } else {
        info!("metrics exporter disabled by configuration");
        (None, None)
    };

    let runtime = MonitorRuntime::new(config, monitor_metrics)?;
    let handle = runtime.start().await?;

    let mut api_server: Option<ApiServer> = None;
    if api_settings.enabled {
        let state = Arc::new(ApiState::new(
            handle.state(),
            mode,
            version.clone(),
            Some(handle.injector()),
        ));
        match spawn_api_server(state, api_settings.listen) {
            Ok(server) => {
                info!(address = %server.addr(), "api server listening");
                api_server = Some(server);
            }
            Err(err) => {
                warn!(error = %err, "failed to start api server");
            }
        }
    } else {
        info!("api server disabled by configuration");
    }

    info!(mode = ?mode, version = %version.cli_string(), "daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    handle.shutdown().await?;

    if let Some(server) = api_server {
        server.shutdown().await?;
    }

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }

    Ok(())
}
