//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Monitoring runtime loop and lifecycle management."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use gridwatch_common::config::AppConfig;
use gridwatch_common::time::jitter_us;
use gridwatch_metrics::MonitorMetrics;
use gridwatch_sim::{FaultInjector, SimulationEngine};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertLog;
use crate::control::ControlActionProcessor;
use crate::notify::NotificationHub;
use crate::registry::PoleRegistry;
use crate::risk::RiskModel;

/// Shared domain state composed once at startup and handed to every surface.
pub struct GridState {
    pub registry: Arc<PoleRegistry>,
    pub alerts: Arc<AlertLog>,
    pub notifications: Arc<NotificationHub>,
    pub risk: Arc<RiskModel>,
    pub processor: ControlActionProcessor,
}

impl GridState {
    pub fn from_config(config: &AppConfig, metrics: Option<MonitorMetrics>) -> Self {
        let registry = Arc::new(PoleRegistry::from_config(config));
        let alerts = Arc::new(AlertLog::new(config.monitor.alert_capacity));
        let notifications = Arc::new(NotificationHub::new(config.monitor.notification_buffer));
        let risk = Arc::new(RiskModel::new());
        let processor = ControlActionProcessor::new(
            registry.clone(),
            alerts.clone(),
            notifications.clone(),
            metrics,
        );
        Self {
            registry,
            alerts,
            notifications,
            risk,
            processor,
        }
    }
}

impl fmt::Debug for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridState")
            .field("poles", &self.registry.len())
            .field("alerts", &self.alerts.active_count())
            .finish_non_exhaustive()
    }
}

/// Primary runtime entrypoint: owns the evaluation loop.
#[derive(Debug)]
pub struct MonitorRuntime {
    config: Arc<AppConfig>,
    metrics: Option<MonitorMetrics>,
}

impl MonitorRuntime {
    pub fn new(config: AppConfig, metrics: Option<MonitorMetrics>) -> Result<Self> {
        if !config.mode.is_simulation() {
            anyhow::bail!("production mode has no ingestion path yet; run in simulation mode");
        }
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            metrics,
        })
    }

    /// Start the evaluation loop and return a handle for lifecycle control.
    pub async fn start(self) -> Result<RuntimeHandle> {
        let state = Arc::new(GridState::from_config(&self.config, self.metrics.clone()));
        let engine = SimulationEngine::from_config(&self.config.simulation)
            .context("failed to initialise simulation engine")?;
        let injector: Arc<dyn FaultInjector> = Arc::new(engine.injector());

        if let Some(metrics) = &self.metrics {
            metrics.set_pole_count(state.registry.len());
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let task = tokio::spawn(monitor_loop(
            self.config.clone(),
            state.clone(),
            engine,
            self.metrics.clone(),
            shutdown_rx,
        ));

        info!(
            poles = state.registry.len(),
            tick_ms = self.config.monitor.tick_interval.as_millis() as u64,
            "monitor runtime started"
        );

        Ok(RuntimeHandle {
            shutdown: shutdown_tx,
            task,
            state,
            injector,
            config: self.config,
        })
    }
}

/// Handle returned from runtime startup, used by the daemon and tests.
pub struct RuntimeHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
    state: Arc<GridState>,
    injector: Arc<dyn FaultInjector>,
    config: Arc<AppConfig>,
}

impl RuntimeHandle {
    pub fn state(&self) -> Arc<GridState> {
        self.state.clone()
    }

    pub fn injector(&self) -> Arc<dyn FaultInjector> {
        self.injector.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            error!(error = %err, "monitor loop join error");
        }
        info!("monitor runtime shutdown complete");
        Ok(())
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

async fn monitor_loop(
    config: Arc<AppConfig>,
    state: Arc<GridState>,
    mut engine: SimulationEngine,
    metrics: Option<MonitorMetrics>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let tick_interval = config.monitor.tick_interval;
    let mut interval = tokio::time::interval(tick_interval);
    let mut tick: u64 = 0;
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("monitor loop shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                tick += 1;
                let now = Instant::now();
                let jitter = jitter_us(now.duration_since(last_tick), tick_interval);
                last_tick = now;

                for (pole_id, spec) in &config.poles {
                    let frame = engine.next_frame(pole_id, spec, tick);
                    if let Some(observation) = state.registry.apply_frame(&frame) {
                        warn!(
                            pole_id = %observation.pole_id,
                            fault = %observation.fault,
                            severity = %observation.severity,
                            "fault detected"
                        );
                        state.processor.record_detection(&observation);
                    }
                    if let Some(pole) = state.registry.get(pole_id) {
                        state.risk.observe(&pole);
                    }
                }

                if let Some(metrics) = &metrics {
                    for (status, count) in state.registry.status_counts() {
                        metrics.set_status_count(&status.to_string(), count);
                    }
                    metrics.set_active_alerts(state.alerts.active_count());
                }
                debug!(tick, jitter_us = jitter, "monitor tick complete");
            }
        }
    }
}
