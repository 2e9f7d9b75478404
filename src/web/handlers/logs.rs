use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::logging::read_logs;
use crate::web::dto::{ApiResponse, LogsResponse};

/// GET /logs - Accumulated log text.
#[utoipa::path(
    get,
    path = "/logs",
    tag = "Status",
    responses(
        (status = 200, description = "Log file contents", body = LogsResponse)
    )
)]
pub async fn get_logs(State(state): State<Arc<AppState>>) -> Json<ApiResponse<LogsResponse>> {
    let logs = read_logs(state.log_file.as_deref()).await;
    Json(ApiResponse::new(LogsResponse { logs }))
}
