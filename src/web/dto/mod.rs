//! Data Transfer Objects for the HTTP API.

pub mod response;

pub use response::*;
