use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use kiln_orders::{NewOrder, Order, OrderStatus};

use crate::app::dto::{ApiResponse, CODE_BAD_REQUEST, CODE_NOT_FOUND, OrderPage, StatusQuery};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/batch-update", post(advance_orders))
        .route("/:id", axum::routing::delete(delete_order))
        .route("/:id/status", put(update_order_status))
}

pub async fn list_orders(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(ApiResponse::ok("orders", OrderPage::from(services.orders.list())))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewOrder>, JsonRejection>,
) -> axum::response::Response {
    let Json(new) = match body {
        Ok(b) => b,
        Err(e) => return errors::api_error(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, e.body_text()),
    };

    match services.create_order(new) {
        Ok(order) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok("order created, ORDER_CREATED sent", order)),
        )
            .into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let Some(raw) = query.status else {
        return errors::api_error(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, "missing status parameter");
    };
    let status: OrderStatus = match raw.parse() {
        Ok(s) => s,
        Err(e) => return errors::order_error_to_response(e),
    };

    match services.update_order_status(id, status) {
        Ok(order) => Json(ApiResponse::ok("order status updated, ORDER_STATUS_CHANGED sent", order)).into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.delete_order(id) {
        Ok(_) => Json(ApiResponse::<Order>::new(
            crate::app::dto::CODE_OK,
            "order deleted, ORDER_DELETED sent",
            None,
        ))
        .into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

/// Advance every open order by one status step.
pub async fn advance_orders(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.advance_orders() {
        Ok(orders) => Json(ApiResponse::ok("orders advanced, ORDER_STATUS_CHANGED sent", orders)).into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

// Non-numeric ids are not order routes at all.
fn parse_id(raw: &str) -> Result<u64, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::api_error(StatusCode::NOT_FOUND, CODE_NOT_FOUND, "no such endpoint"))
}
