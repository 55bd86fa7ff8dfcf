use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use kiln_orders::OrderError;

use crate::app::dto::{ApiResponse, CODE_BAD_REQUEST, CODE_INTERNAL, CODE_ORDER_NOT_FOUND};

pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    match err {
        OrderError::NotFound(_) => api_error(StatusCode::NOT_FOUND, CODE_ORDER_NOT_FOUND, "order not found"),
        OrderError::UnknownStatus(_) | OrderError::Invalid(_) => {
            api_error(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, err.to_string())
        }
        OrderError::Publish(e) => {
            tracing::error!(error = %e, "order event was not published");
            api_error(StatusCode::SERVICE_UNAVAILABLE, CODE_INTERNAL, e.to_string())
        }
        OrderError::Encode(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, CODE_INTERNAL, e.to_string()),
    }
}

/// Error body in the shared envelope, with `data: null`.
pub fn api_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> axum::response::Response {
    (status, Json(ApiResponse::<()>::new(code, message, None))).into_response()
}
