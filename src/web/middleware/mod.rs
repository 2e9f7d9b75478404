//! Middleware for the HTTP API.

pub mod cors;
pub mod rate_limit;

pub use cors::create_cors_layer;
pub use rate_limit::{admission_gate, get_client_ip, AdmissionGate};
