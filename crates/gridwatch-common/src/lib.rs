//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Shared primitives and utilities for the monitoring runtime."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
//! Shared primitives for the GridWatch workspace.
//! This crate exposes configuration loading, logging, and version metadata
//! utilities consumed across the workspace.

pub mod config;
pub mod fault;
pub mod logging;
pub mod time;
pub mod version;

pub use config::{
    ApiConfig, AppConfig, GeoLocation, LoggingConfig, MetricsConfig, Mode, MonitorConfig,
    PoleSpec, SimulationConfig,
};
pub use fault::{FaultKind, Severity};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
