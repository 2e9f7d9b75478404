//! HTTP API.
//!
//! Two routes trigger sends and sit behind the per-client admission gate;
//! the rest report configuration, quota usage, logs and liveness.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use openapi::ApiDoc;
pub use router::create_router;
pub use server::WebServer;
