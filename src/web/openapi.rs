//! OpenAPI document and Swagger UI.

use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{
    ConfigResponse, ConfigStatusResponse, HealthResponse, LogsResponse, SendResponse,
    StatsResponse,
};
use super::error::{ErrorBody, ErrorCode, ErrorDetail};
use super::handlers::{self, AppState};

/// OpenAPI description of the HTTP API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "nudge",
        description = "Reminder mailer with per-client throttling and an hourly send cap. \
Successful responses wrap the payload in a `data` field; errors are `{\"error\": {\"code\", \"message\"}}`."
    ),
    paths(
        handlers::reminder::send_reminder,
        handlers::reminder::send_test_email,
        handlers::config::get_config,
        handlers::config::get_config_status,
        handlers::stats::get_stats,
        handlers::logs::get_logs,
        handlers::health::health_check,
    ),
    components(schemas(
        SendResponse,
        ConfigResponse,
        ConfigStatusResponse,
        StatsResponse,
        LogsResponse,
        HealthResponse,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
    )),
    tags(
        (name = "Send", description = "Trigger email sends"),
        (name = "Status", description = "Configuration, usage and liveness")
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/docs`, serving the document at `/api-docs/openapi.json`.
pub fn create_swagger_router() -> Router<Arc<AppState>> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
