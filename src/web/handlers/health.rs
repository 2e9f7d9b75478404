use axum::Json;
use chrono::Local;

use crate::web::dto::{ApiResponse, HealthResponse};

/// GET /health - Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Status",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::new(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Local::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
