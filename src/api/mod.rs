//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /ns/:namespace/keys/:key` - Store a value (raw body, optional `ttl_ms`)
//! - `GET /ns/:namespace/keys/:key` - Retrieve a value
//! - `DELETE /ns/:namespace` - Clear a namespace
//! - `GET /ns/:namespace/size` - Count live keys in a namespace
//! - `GET /stats` - Get store statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
