/// HTTP Server Module
///
/// Provides the health/status endpoints used by the hosting platform and the
/// keep-alive pinger, plus a manual trigger for the content workflow.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::state::ServiceState;
use crate::workflow::{Workflow, WorkflowOutcome};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceState>,
    pub workflow: Arc<Workflow>,
    /// Bearer secret required by `/trigger-post` when set
    pub trigger_secret: Option<String>,
}

/// Create and configure the HTTP server router
pub fn create_router(state: AppState) -> Router {
    with_middleware(
        Router::new()
            .route("/", get(root))
            .route("/health", get(health_check))
            .route("/status", get(status_endpoint))
            .route("/trigger-post", post(trigger_post_endpoint))
            .fallback(not_found)
            .with_state(state),
    )
}

/// Catch handler panics as 500s and allow cross-origin calls
fn with_middleware(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    log::error!("Request handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "success": false,
            "error": "internal server error"
        })),
    )
        .into_response()
}

/// Service banner
async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": state.service.service_name,
        "status": "running",
        "uptime_seconds": state.service.uptime_secs()
    }))
}

/// Health check endpoint, also the keep-alive target
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.service.uptime_secs()
    }))
}

async fn status_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let service = &state.service;
    Json(serde_json::json!({
        "status": "running",
        "service": service.service_name,
        "started_at": service.started_at.to_rfc3339(),
        "uptime_seconds": service.uptime_secs(),
        "schedule": service.schedule,
        "keep_alive": {
            "enabled": service.keep_alive_enabled,
            "interval_minutes": service.keep_alive_interval_minutes,
            "max_attempts": service.keep_alive_retries,
            "backoff_seconds": service.keep_alive_backoff_secs
        }
    }))
}

/// Run the content workflow on demand
async fn trigger_post_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    // Check authentication if trigger_secret is set
    if let Some(secret) = &state.trigger_secret {
        let token = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        if token != Some(secret.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "success": false,
                    "error": "unauthorized"
                })),
            );
        }
    }

    log::info!("Content workflow triggered via HTTP endpoint");

    match state.workflow.run().await {
        WorkflowOutcome::Published { post_id } => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Post generated and published",
                "post_id": post_id
            })),
        ),
        WorkflowOutcome::NoContent => trigger_failed("content generation produced no text"),
        WorkflowOutcome::Skipped => trigger_failed("generated text was empty"),
        WorkflowOutcome::PublishFailed(reason) => {
            trigger_failed(&format!("publish failed: {}", reason))
        }
    }
}

fn trigger_failed(error: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "success": false,
            "error": error
        })),
    )
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}

/// Start the HTTP server and serve until `shutdown` resolves
pub async fn start_server<F>(state: AppState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind HTTP server")?;

    log::info!("HTTP server listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    Ok(())
}
