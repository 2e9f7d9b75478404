//! Send handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{ApiResponse, SendResponse};
use crate::web::error::{ApiError, ErrorBody};

/// GET / - Send the work reminder to every recipient.
#[utoipa::path(
    get,
    path = "/",
    tag = "Send",
    responses(
        (status = 200, description = "Reminder sent", body = SendResponse),
        (status = 429, description = "Rate limited or hourly quota reached", body = ErrorBody),
        (status = 500, description = "SMTP authentication failed", body = ErrorBody)
    )
)]
pub async fn send_reminder(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SendResponse>>, ApiError> {
    tracing::info!(recipients = state.recipients.len(), "Sending work reminder");

    state
        .pipeline
        .send(
            &state.messages.reminder_subject,
            &state.messages.reminder_body,
            &state.recipients,
        )
        .await?;

    Ok(Json(ApiResponse::new(SendResponse {
        message: "Reminders sent to all recipients".to_string(),
        recipients: state.recipients.len(),
    })))
}

/// GET /test-email - Send the deliverability test email.
#[utoipa::path(
    get,
    path = "/test-email",
    tag = "Send",
    responses(
        (status = 200, description = "Test email sent", body = SendResponse),
        (status = 429, description = "Rate limited or hourly quota reached", body = ErrorBody),
        (status = 500, description = "SMTP authentication failed", body = ErrorBody)
    )
)]
pub async fn send_test_email(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SendResponse>>, ApiError> {
    tracing::info!(recipients = state.recipients.len(), "Sending test email");

    state
        .pipeline
        .send(
            &state.messages.test_subject,
            &state.messages.test_body,
            &state.recipients,
        )
        .await?;

    Ok(Json(ApiResponse::new(SendResponse {
        message: "Test email sent".to_string(),
        recipients: state.recipients.len(),
    })))
}
