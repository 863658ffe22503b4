//! ---
//! gw_section: "05-networking-external-interfaces"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "REST control surface for operator tooling."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---

use std::collections::BTreeMap;
use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use gridwatch_common::config::Mode;
use gridwatch_common::fault::FaultKind;
use gridwatch_common::version::VersionInfo;
use gridwatch_core::control::{ControlError, IssueReport};
use gridwatch_core::notify::Notification;
use gridwatch_core::pole::Pole;
use gridwatch_core::runtime::GridState;
use gridwatch_core::Alert;
use gridwatch_sim::FaultInjector;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

/// Shared API state exposed to handlers.
pub struct ApiState {
    grid: Arc<GridState>,
    version: VersionInfo,
    mode: Mode,
    start: Instant,
    injector: Option<Arc<dyn FaultInjector>>,
}

impl ApiState {
    pub fn new(
        grid: Arc<GridState>,
        mode: Mode,
        version: VersionInfo,
        injector: Option<Arc<dyn FaultInjector>>,
    ) -> Self {
        Self {
            grid,
            version,
            mode,
            start: Instant::now(),
            injector,
        }
    }

    fn status(&self) -> StatusResponse {
        let status_counts: BTreeMap<String, usize> = self
            .grid
            .registry
            .status_counts()
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect();
        StatusResponse {
            mode: self.mode,
            version: self.version.cli_string(),
            uptime_seconds: self.start.elapsed().as_secs(),
            pole_count: self.grid.registry.len(),
            status_counts,
            active_alerts: self.grid.alerts.active_count(),
        }
    }

    fn pole_view(&self, pole: Pole) -> PoleView {
        let risk = self.grid.risk.score(&pole.id);
        PoleView { pole, risk }
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("version", &self.version)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Spawn the REST API server.
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let router = Router::new()
        .route("/api/status", get(get_status))
        .route("/api/poles", get(get_poles))
        .route("/api/poles/:id", get(get_pole))
        .route("/api/poles/:id/isolate", post(post_isolate))
        .route("/api/poles/:id/restore", post(post_restore))
        .route("/api/poles/:id/fix", post(post_fix))
        .route("/api/poles/:id/maintenance", post(post_maintenance))
        .route("/api/poles/:id/issues", post(post_issue))
        .route("/api/poles/:id/inject", post(post_inject))
        .route("/api/alerts", get(get_alerts))
        .route("/api/alerts/:id", delete(delete_alert))
        .route("/api/notifications", get(get_notifications))
        .route("/api/reset", post(post_reset))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %local_addr, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %local_addr, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    mode: Mode,
    version: String,
    uptime_seconds: u64,
    pole_count: usize,
    status_counts: BTreeMap<String, usize>,
    active_alerts: usize,
}

/// A pole snapshot decorated with its current risk score.
#[derive(Debug, Serialize)]
struct PoleView {
    #[serde(flatten)]
    pole: Pole,
    risk: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OperatorRequest {
    operator: String,
}

impl Default for OperatorRequest {
    fn default() -> Self {
        Self {
            operator: "operator".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InjectRequest {
    fault: FaultKind,
}

#[derive(Debug, Serialize)]
struct AppliedResponse {
    applied: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::UnknownPole(_) => Self::not_found(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

async fn get_status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(state.status())
}

async fn get_poles(State(state): State<Arc<ApiState>>) -> Json<Vec<PoleView>> {
    let views = state
        .grid
        .registry
        .snapshot()
        .into_iter()
        .map(|pole| state.pole_view(pole))
        .collect();
    Json(views)
}

async fn get_pole(
    State(state): State<Arc<ApiState>>,
    Path(pole_id): Path<String>,
) -> Result<Json<PoleView>, ApiError> {
    state
        .grid
        .registry
        .get(&pole_id)
        .map(|pole| Json(state.pole_view(pole)))
        .ok_or_else(|| ApiError::not_found(format!("pole {} is not registered", pole_id)))
}

async fn get_alerts(State(state): State<Arc<ApiState>>) -> Json<Vec<Alert>> {
    Json(state.grid.alerts.snapshot())
}

async fn delete_alert(
    State(state): State<Arc<ApiState>>,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<AppliedResponse>, ApiError> {
    if state.grid.alerts.dismiss(alert_id) {
        Ok(Json(AppliedResponse { applied: true }))
    } else {
        Err(ApiError::not_found(format!(
            "alert {} is not active",
            alert_id
        )))
    }
}

async fn get_notifications(State(state): State<Arc<ApiState>>) -> Json<Vec<Notification>> {
    Json(state.grid.notifications.recent())
}

async fn post_isolate(
    State(state): State<Arc<ApiState>>,
    Path(pole_id): Path<String>,
    body: Option<Json<OperatorRequest>>,
) -> Result<Json<PoleView>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let pole = state.grid.processor.isolate(&pole_id, &request.operator)?;
    Ok(Json(state.pole_view(pole)))
}

async fn post_restore(
    State(state): State<Arc<ApiState>>,
    Path(pole_id): Path<String>,
    body: Option<Json<OperatorRequest>>,
) -> Result<Json<PoleView>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let pole = state.grid.processor.restore(&pole_id, &request.operator)?;
    Ok(Json(state.pole_view(pole)))
}

async fn post_fix(
    State(state): State<Arc<ApiState>>,
    Path(pole_id): Path<String>,
    body: Option<Json<OperatorRequest>>,
) -> Result<Json<PoleView>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let pole = state.grid.processor.fix(&pole_id, &request.operator)?;
    Ok(Json(state.pole_view(pole)))
}

async fn post_maintenance(
    State(state): State<Arc<ApiState>>,
    Path(pole_id): Path<String>,
    body: Option<Json<OperatorRequest>>,
) -> Result<Json<PoleView>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let pole = state
        .grid
        .processor
        .begin_maintenance(&pole_id, &request.operator)?;
    Ok(Json(state.pole_view(pole)))
}

async fn post_issue(
    State(state): State<Arc<ApiState>>,
    Path(pole_id): Path<String>,
    Json(report): Json<IssueReport>,
) -> Result<Json<PoleView>, ApiError> {
    let pole = state.grid.processor.add_issue(&pole_id, report)?;
    Ok(Json(state.pole_view(pole)))
}

async fn post_inject(
    State(state): State<Arc<ApiState>>,
    Path(pole_id): Path<String>,
    Json(request): Json<InjectRequest>,
) -> Result<(StatusCode, Json<AppliedResponse>), ApiError> {
    if state.grid.registry.get(&pole_id).is_none() {
        return Err(ApiError::not_found(format!(
            "pole {} is not registered",
            pole_id
        )));
    }
    let Some(injector) = &state.injector else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "fault injection unavailable",
        ));
    };
    injector.inject_fault(&pole_id, request.fault);
    Ok((StatusCode::ACCEPTED, Json(AppliedResponse { applied: true })))
}

async fn post_reset(State(state): State<Arc<ApiState>>) -> Json<AppliedResponse> {
    state.grid.processor.reset();
    Json(AppliedResponse { applied: true })
}
