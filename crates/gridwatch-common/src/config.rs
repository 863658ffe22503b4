//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Shared primitives and utilities for the monitoring runtime."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_mode() -> Mode {
    Mode::Simulation
}

fn default_nominal_voltage() -> f64 {
    230.0
}

fn default_nominal_current() -> f64 {
    12.0
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_voltage_tolerance() -> f64 {
    0.08
}

fn default_current_limit_ratio() -> f64 {
    1.5
}

fn default_alert_capacity() -> usize {
    256
}

fn default_notification_buffer() -> usize {
    128
}

fn default_simulation_seed() -> u64 {
    0x90_1E5
}

fn default_fault_probability() -> f64 {
    0.02
}

fn default_noise_sigma() -> f64 {
    0.2
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    "0.0.0.0:9898"
        .parse()
        .expect("valid default metrics address")
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default api address")
}

/// Primary configuration object for the GridWatch runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default)]
    pub poles: IndexMap<String, PoleSpec>,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "GRIDWATCH_CONFIG";

    /// Load configuration from disk, respecting the `GRIDWATCH_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Retrieve a pole specification by identifier.
    pub fn pole(&self, pole_id: &str) -> Option<&PoleSpec> {
        self.poles.get(pole_id)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.poles.is_empty() {
            return Err(anyhow!("configuration must declare at least one pole"));
        }
        for (pole_id, pole) in &self.poles {
            pole.validate(pole_id)?;
        }
        self.monitor.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            poles: IndexMap::new(),
            monitor: MonitorConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Operating mode for the monitoring runtime.
///
/// `Production` is accepted by the parser for forward compatibility but the
/// daemon refuses to start in it: no real ingestion path exists yet.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    #[default]
    Simulation,
}

impl Mode {
    pub fn is_simulation(&self) -> bool {
        matches!(self, Mode::Simulation)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Mode::Production),
            "simulation" => Ok(Mode::Simulation),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// Static description of a monitored pole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoleSpec {
    #[serde(default)]
    pub description: Option<String>,
    pub location: GeoLocation,
    #[serde(default = "default_nominal_voltage")]
    pub nominal_voltage_v: f64,
    #[serde(default = "default_nominal_current")]
    pub nominal_current_a: f64,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
}

impl PoleSpec {
    pub fn validate(&self, pole_id: &str) -> Result<()> {
        if self.nominal_voltage_v <= 0.0 {
            return Err(anyhow!(
                "pole '{}' must declare a positive nominal voltage",
                pole_id
            ));
        }
        if self.nominal_current_a <= 0.0 {
            return Err(anyhow!(
                "pole '{}' must declare a positive nominal current",
                pole_id
            ));
        }
        self.location.validate(pole_id)
    }
}

impl Default for PoleSpec {
    fn default() -> Self {
        Self {
            description: None,
            location: GeoLocation::default(),
            nominal_voltage_v: default_nominal_voltage(),
            nominal_current_a: default_nominal_current(),
            metadata: IndexMap::new(),
        }
    }
}

/// Geographic position of a pole as rendered on the operator map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub region: Option<String>,
}

impl GeoLocation {
    pub fn validate(&self, pole_id: &str) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(anyhow!("pole '{}' latitude out of range", pole_id));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(anyhow!("pole '{}' longitude out of range", pole_id));
        }
        Ok(())
    }
}

/// Tuning knobs for the evaluation loop and derived state.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_tick_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    /// Relative voltage deviation tolerated before a sag/surge is flagged.
    #[serde(default = "default_voltage_tolerance")]
    pub voltage_tolerance: f64,
    /// Multiple of nominal current above which a pole counts as overloaded.
    #[serde(default = "default_current_limit_ratio")]
    pub current_limit_ratio: f64,
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("monitor tick_interval must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.voltage_tolerance) || self.voltage_tolerance == 0.0 {
            return Err(anyhow!("monitor voltage_tolerance must be within (0, 1)"));
        }
        if self.current_limit_ratio <= 1.0 {
            return Err(anyhow!("monitor current_limit_ratio must exceed 1.0"));
        }
        if self.alert_capacity == 0 {
            return Err(anyhow!("monitor alert_capacity must be non-zero"));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            voltage_tolerance: default_voltage_tolerance(),
            current_limit_ratio: default_current_limit_ratio(),
            alert_capacity: default_alert_capacity(),
            notification_buffer: default_notification_buffer(),
        }
    }
}

/// Behaviour of the synthetic telemetry source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
    /// Per-pole, per-tick probability of a spontaneous fault.
    #[serde(default = "default_fault_probability")]
    pub fault_probability: f64,
    #[serde(default = "default_noise_sigma")]
    pub noise_sigma: f64,
    #[serde(default)]
    pub scenario_files: Vec<PathBuf>,
    /// Overlay Gaussian noise on replayed scenario frames.
    #[serde(default)]
    pub hybrid: bool,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fault_probability) {
            return Err(anyhow!("simulation fault_probability must be within [0, 1]"));
        }
        if self.noise_sigma <= 0.0 {
            return Err(anyhow!("simulation noise_sigma must be positive"));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            random_seed: default_simulation_seed(),
            fault_probability: default_fault_probability(),
            noise_sigma: default_noise_sigma(),
            scenario_files: Vec::new(),
            hybrid: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}
