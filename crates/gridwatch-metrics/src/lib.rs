//! ---
//! gw_section: "03-observability"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Metrics collection and export utilities."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across services.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let local_addr = std_listener
        .local_addr()
        .with_context(|| "failed to resolve metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %local_addr, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

/// Prometheus scrape endpoint. Returns `text/plain` metrics even on large registries.
async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        ),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain"),
                )],
                String::from("metrics encoding error"),
            )
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Return the bound address for convenience.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Metrics recorded by the daemon process itself.
#[derive(Clone)]
pub struct DaemonMetrics {
    registry: SharedRegistry,
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "gridwatchd_starts_total",
            "Total number of times the GridWatch daemon has initialised",
        ))?;
        registry.register(Box::new(starts_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "gridwatchd_config_load_seconds",
                "Time spent loading and validating configuration",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(config_load_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new(
                "gridwatchd_build_info",
                "Build metadata for the running daemon binary",
            ),
            &["version", "profile"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, profile: &str) {
        self.build_info.with_label_values(&[version, profile]).set(1.0);
    }
}

/// Metric families describing the monitored pole population.
#[derive(Clone, Debug)]
pub struct MonitorMetrics {
    registry: SharedRegistry,
    poles_total: IntGauge,
    pole_status: IntGaugeVec,
    alerts_active: IntGauge,
    faults_total: IntCounterVec,
    control_actions_total: IntCounterVec,
}

impl MonitorMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let poles_total = IntGauge::with_opts(Opts::new(
            "gridwatch_poles_total",
            "Number of poles tracked by the registry",
        ))?;
        registry.register(Box::new(poles_total.clone()))?;

        let pole_status = IntGaugeVec::new(
            Opts::new(
                "gridwatch_pole_status",
                "Pole count per lifecycle status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(pole_status.clone()))?;

        let alerts_active = IntGauge::with_opts(Opts::new(
            "gridwatch_alerts_active",
            "Open alerts in the alert log",
        ))?;
        registry.register(Box::new(alerts_active.clone()))?;

        let faults_total = IntCounterVec::new(
            Opts::new(
                "gridwatch_faults_total",
                "Detected faults by fault kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(faults_total.clone()))?;

        let control_actions_total = IntCounterVec::new(
            Opts::new(
                "gridwatch_control_actions_total",
                "Operator control actions applied, by action",
            ),
            &["action"],
        )?;
        registry.register(Box::new(control_actions_total.clone()))?;

        Ok(Self {
            registry,
            poles_total,
            pole_status,
            alerts_active,
            faults_total,
            control_actions_total,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn set_pole_count(&self, count: usize) {
        self.poles_total.set(count as i64);
    }

    pub fn set_status_count(&self, status: &str, count: usize) {
        self.pole_status
            .with_label_values(&[status])
            .set(count as i64);
    }

    pub fn set_active_alerts(&self, count: usize) {
        self.alerts_active.set(count as i64);
    }

    pub fn record_fault(&self, kind: &str) {
        self.faults_total.with_label_values(&[kind]).inc();
    }

    pub fn record_control_action(&self, action: &str) {
        self.control_actions_total.with_label_values(&[action]).inc();
    }
}

pub use prometheus;
