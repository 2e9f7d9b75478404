//! Router configuration for the HTTP API.

use axum::{extract::Request, middleware, middleware::Next, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::handlers::{
    get_config, get_config_status, get_logs, get_stats, health_check, send_reminder,
    send_test_email, AppState,
};
use super::middleware::{admission_gate, create_cors_layer, AdmissionGate};
use super::openapi::create_swagger_router;
use crate::config::ServerConfig;

/// Create the main router.
///
/// Only the send endpoints sit behind the admission gate.
pub fn create_router(app_state: Arc<AppState>, config: &ServerConfig) -> Router {
    let gate = AdmissionGate::new(app_state.limiter.clone(), config.trust_proxy_headers);

    let send_routes = Router::new()
        .route("/", get(send_reminder))
        .route("/test-email", get(send_test_email))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            admission_gate(gate.clone(), req, next)
        }));

    let status_routes = Router::new()
        .route("/config", get(get_config))
        .route("/config/status", get(get_config_status))
        .route("/stats", get(get_stats))
        .route("/logs", get(get_logs))
        .route("/health", get(health_check));

    Router::new()
        .merge(send_routes)
        .merge(status_routes)
        .merge(create_swagger_router())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins)),
        )
        .with_state(app_state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such route")
}
