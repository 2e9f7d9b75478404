//! Response DTOs for the HTTP API.

use serde::Serialize;
use utoipa::ToSchema;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Acknowledgement of a send request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SendResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Number of configured recipients.
    pub recipients: usize,
}

/// Non-sensitive view of the running configuration.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfigResponse {
    /// Sender address.
    pub sender: String,
    /// Number of configured recipients.
    pub recipient_count: usize,
    /// Relay as `host:port`.
    pub smtp_server: String,
    /// Whether implicit TLS is used.
    pub ssl: bool,
    /// Hourly email cap.
    pub max_emails_per_hour: u32,
    /// Load status.
    pub status: String,
}

/// Whether any settings still hold placeholder values.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfigStatusResponse {
    /// True when nothing is left at a placeholder value.
    pub config_ok: bool,
    /// Environment variables to set.
    pub missing_variables: Vec<String>,
    /// Human-readable summary.
    pub message: String,
}

/// Hourly quota usage.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Emails sent in the current window.
    pub emails_sent_this_hour: u32,
    /// Hourly cap.
    pub max_emails_per_hour: u32,
    /// Sends left in the current window.
    pub remaining: u32,
    /// End of the current window (RFC 3339). Absent when no window is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_reset: Option<String>,
    /// Service status.
    pub status: String,
}

/// Accumulated log text.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogsResponse {
    /// Log file contents, or a placeholder.
    pub logs: String,
}

/// Liveness report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy`.
    pub status: String,
    /// Current time (RFC 3339).
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}
