//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: broker, order book and producer wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: response envelope and JSON DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/actuator/health", get(routes::system::health))
        .nest("/api", routes::router())
        .fallback(routes::system::not_found)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
