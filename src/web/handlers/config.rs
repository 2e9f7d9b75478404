//! Configuration handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{ApiResponse, ConfigResponse, ConfigStatusResponse};

/// GET /config - Non-sensitive view of the running configuration.
///
/// The password is never included.
#[utoipa::path(
    get,
    path = "/config",
    tag = "Status",
    responses(
        (status = 200, description = "Configuration summary", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ConfigResponse>> {
    Json(ApiResponse::new(ConfigResponse {
        sender: state.sender_address.clone(),
        recipient_count: state.recipients.len(),
        smtp_server: state.smtp_server.clone(),
        ssl: state.use_ssl,
        max_emails_per_hour: state.quota().max_per_hour(),
        status: "Configuration loaded".to_string(),
    }))
}

/// GET /config/status - Report settings still at placeholder values.
#[utoipa::path(
    get,
    path = "/config/status",
    tag = "Status",
    responses(
        (status = 200, description = "Configuration completeness", body = ConfigStatusResponse)
    )
)]
pub async fn get_config_status(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ConfigStatusResponse>> {
    let missing: Vec<String> = state.placeholders.iter().map(|s| s.to_string()).collect();

    let message = if missing.is_empty() {
        "Configuration complete".to_string()
    } else {
        format!("Missing settings: {}", missing.join(", "))
    };

    Json(ApiResponse::new(ConfigStatusResponse {
        config_ok: missing.is_empty(),
        missing_variables: missing,
        message,
    }))
}
