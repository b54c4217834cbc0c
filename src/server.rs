use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    commands,
    config::{ScanConfig, ServerConfig},
    error::Error,
    lookup::{self, HttpLookup, LookupError, NetLookup},
    ports, scanner,
    types::{PingResponse, PortScanResponse, ScanRequest},
};

/// Per-process handler context. Read-only; requests share no mutable state.
#[derive(Clone)]
pub struct AppState {
    scan: ScanConfig,
    lookup: Arc<dyn NetLookup>,
}

impl AppState {
    pub fn new(scan: ScanConfig, lookup: Arc<dyn NetLookup>) -> Self {
        Self { scan, lookup }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, LookupError> {
        let lookup = HttpLookup::new(&config.lookup)?;
        Ok(Self::new(config.scan.clone(), Arc::new(lookup)))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = json!({ "ok": false, "error": self.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Build the application router: JSON endpoints plus static UI fallback.
pub fn router(state: AppState, ui_dir: impl AsRef<std::path::Path>) -> Router {
    let static_svc = ServeDir::new(ui_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/server_info", get(get_server_info))
        .route("/ping_test", get(get_ping))
        .route("/port_scan", post(post_port_scan))
        .route("/port_commands", post(post_port_commands))
        .with_state(state)
        .fallback_service(static_svc)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` is cancelled.
pub async fn spawn_server(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    let app = router(AppState::from_config(&config)?, &config.ui_dir);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;

    info!("Serving on http://{}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.cancelled_owned())
    .await?;
    info!("server stopped");
    Ok(())
}

/// Parse a request body as JSON regardless of the declared content type.
fn json_body(body: &[u8]) -> Result<Value, Error> {
    serde_json::from_slice(body).map_err(|_| Error::InvalidBody)
}

async fn get_ping() -> impl IntoResponse {
    let ts = OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9;
    (StatusCode::OK, Json(PingResponse { ok: true, ts }))
}

async fn get_server_info(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string());

    Json(lookup::server_info(app.lookup.as_ref(), client_ip).await)
}

async fn post_port_scan(State(app): State<AppState>, body: Bytes) -> Result<Response, Error> {
    let data = json_body(&body)?;
    let host = data.get("host").and_then(Value::as_str).unwrap_or("");
    if host.trim().is_empty() {
        return Err(Error::NoHost);
    }
    let ports = data
        .get("ports")
        .map(ports::normalize_ports)
        .unwrap_or_default();
    let req = ScanRequest::new(host, ports)?;

    let scan = scanner::scan(&req, &app.scan).await;
    Ok(Json(PortScanResponse { ok: true, scan }).into_response())
}

async fn post_port_commands(body: Bytes) -> Result<Response, Error> {
    let data = json_body(&body)?;
    let port = match data.get("port") {
        None => 0,
        Some(v) => ports::port_value(v).ok_or(Error::InvalidPort)?,
    };
    let action = match data.get("action") {
        None => "open",
        Some(v) => v.as_str().ok_or(Error::InvalidAction)?,
    };

    let out = commands::port_commands(port, action)?;
    Ok(Json(out).into_response())
}
