use crate::config::Listener;
use crate::proxy::{BadRequest, ElevationProxy};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Bind the configured listener and serve the elevation API until the
/// process exits.
pub async fn serve(listener: &Listener, proxy: Arc<ElevationProxy>) -> Result<(), ApiError> {
    let app = router(proxy);
    let addr = format!("{}:{}", listener.host, listener.port);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "elevation proxy listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(proxy: Arc<ElevationProxy>) -> Router {
    Router::new()
        .route("/elevation", post(elevation))
        .route("/healthz", get(healthz))
        .with_state(proxy)
}

#[derive(Serialize)]
struct ElevationResponse {
    status: &'static str,
    results: Vec<Value>,
}

impl IntoResponse for ElevationResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    status: &'static str,
    error: String,
}

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorResponse {
            status: "ERROR",
            error: self.to_string(),
        });
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

async fn elevation(
    State(proxy): State<Arc<ElevationProxy>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ElevationResponse, BadRequest> {
    let Json(payload) = payload.map_err(|_| BadRequest::InvalidJson)?;
    let results = proxy.handle_elevation(&payload).await?;
    Ok(ElevationResponse {
        status: "OK",
        results,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    upstream: String,
}

async fn healthz(State(proxy): State<Arc<ElevationProxy>>) -> Response {
    let body = HealthResponse {
        ok: true,
        upstream: proxy.upstream_endpoint().to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}
