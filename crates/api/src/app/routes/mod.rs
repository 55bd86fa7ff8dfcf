use axum::Router;

pub mod broker;
pub mod orders;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/kafka", broker::router())
        .nest("/orders", orders::router())
}
