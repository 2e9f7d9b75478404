use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{ApiResponse, StatsResponse};

/// GET /stats - Hourly quota usage.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Status",
    responses(
        (status = 200, description = "Quota usage", body = StatsResponse)
    )
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsResponse>> {
    let snapshot = state.quota().snapshot();

    Json(ApiResponse::new(StatsResponse {
        emails_sent_this_hour: snapshot.count,
        max_emails_per_hour: snapshot.max_per_hour,
        remaining: snapshot.remaining(),
        next_reset: snapshot.resets_at.map(|t| t.to_rfc3339()),
        status: "active".to_string(),
    }))
}
