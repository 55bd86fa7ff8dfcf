use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto::CODE_NOT_FOUND;
use crate::app::errors;
use crate::app::services::AppServices;

/// Liveness plus a broker summary. Not wrapped in `ApiResponse`.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let view = services.health();
    let status = if view.status == "UP" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(view))
}

pub async fn not_found() -> axum::response::Response {
    errors::api_error(StatusCode::NOT_FOUND, CODE_NOT_FOUND, "no such endpoint")
}
