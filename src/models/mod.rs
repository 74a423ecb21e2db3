//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) shared by the
//! server handlers and the remote store client.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::SetQuery;
pub use responses::{
    ClearResponse, ErrorResponse, HealthResponse, SetResponse, SizeResponse, StatsResponse,
};
