use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, sse::Event as SseEvent},
    routing::get,
    Json, Router,
};

use crate::app::dto::ApiResponse;
use crate::app::services::{self, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/messages", get(messages))
        .route("/topics/:topic", get(topic))
        .route("/dead-letters", get(dead_letters))
        .route("/outcomes", get(outcomes))
}

pub async fn status(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(ApiResponse::ok("broker status", services.broker_status()))
}

/// Every message across all topics, in publish order.
pub async fn messages(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(ApiResponse::ok("broker messages", services.broker.all_messages()))
}

pub async fn topic(
    Extension(services): Extension<Arc<AppServices>>,
    Path(topic): Path<String>,
) -> impl IntoResponse {
    Json(ApiResponse::ok("topic info", services.broker.topic_info(&topic)))
}

pub async fn dead_letters(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(ApiResponse::ok("dead-lettered messages", services.broker.dead_letters()))
}

pub async fn outcomes(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::outcome_sse_stream(services)
}
