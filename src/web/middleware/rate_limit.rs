//! Admission gate for the send endpoints.

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};

use crate::rate_limit::{RateLimitResult, SlidingWindowLimiter};
use crate::web::error::ApiError;

/// How often idle client entries are dropped.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Identity used when the client address cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// State for the admission gate.
#[derive(Clone)]
pub struct AdmissionGate {
    limiter: Arc<SlidingWindowLimiter>,
    trust_proxy_headers: bool,
}

impl AdmissionGate {
    /// Create a gate over `limiter`.
    pub fn new(limiter: Arc<SlidingWindowLimiter>, trust_proxy_headers: bool) -> Self {
        Self {
            limiter,
            trust_proxy_headers,
        }
    }

    /// Start a background task to periodically clean up idle clients.
    pub fn start_cleanup_task(&self) {
        let limiter = self.limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            interval.tick().await;

            loop {
                interval.tick().await;
                let before = limiter.tracked_clients();
                limiter.cleanup();
                tracing::debug!(
                    removed = before.saturating_sub(limiter.tracked_clients()),
                    "Rate limiter cleanup"
                );
            }
        });
    }
}

/// Extract the client identity from a request.
///
/// Proxy headers are only consulted when `trust_proxy_headers` is set.
pub fn get_client_ip(req: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        // Take the first IP in the chain
        if let Some(ip) = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return ip.to_string();
        }

        if let Some(ip) = req
            .headers()
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return ip.to_string();
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    UNKNOWN_CLIENT.to_string()
}

/// Reject the request with 429 when the client is over its request budget.
pub async fn admission_gate(gate: AdmissionGate, req: Request, next: Next) -> Response {
    let ip = get_client_ip(&req, gate.trust_proxy_headers);

    match gate.limiter.check(&ip) {
        RateLimitResult::Allowed => next.run(req).await,
        RateLimitResult::Denied { retry_after } => {
            tracing::warn!(
                ip = %ip,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            ApiError::rate_limited(retry_after).into_response()
        }
    }
}
