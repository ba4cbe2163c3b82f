use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use fairmart_auth::Permission;
use fairmart_core::OrderId;
use fairmart_infra::store::Pagination;

use crate::app::routes::common::{guard_actor, guard_customer};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let customer_id = match guard_customer(&principal, &Permission::ORDERS_PLACE) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let request = match body.into_new_order(customer_id) {
        Ok(v) => v,
        Err(e) => return errors::market_error_to_response(e),
    };
    match services.place_order(&request).await {
        Ok(view) => (StatusCode::CREATED, Json(dto::order_view_to_json(&view))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListOrdersQuery>,
) -> axum::response::Response {
    let actor = match guard_actor(&principal, &Permission::ORDERS_READ) {
        Ok(a) => a,
        Err(res) => return res,
    };
    let status = match query.status() {
        Ok(s) => s,
        Err(e) => return errors::market_error_to_response(e),
    };
    let page = Pagination::new(query.page, query.limit);
    match services.list_orders(actor, status, page).await {
        Ok(page) => (StatusCode::OK, Json(dto::order_page_to_json(&page))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn order_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let customer_id = match guard_customer(&principal, &Permission::ORDERS_READ) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.customer_stats(customer_id).await {
        Ok(stats) => (StatusCode::OK, Json(dto::order_stats_to_json(&stats))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let actor = match guard_actor(&principal, &Permission::ORDERS_READ) {
        Ok(a) => a,
        Err(res) => return res,
    };
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("order"),
    };
    match services.order_detail(actor, id).await {
        Ok(detail) => (StatusCode::OK, Json(dto::order_detail_to_json(&detail))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

/// The body is optional; without a reason the role's default is recorded.
pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::CancelOrderRequest>>,
) -> axum::response::Response {
    let actor = match guard_actor(&principal, &Permission::ORDERS_CANCEL) {
        Ok(a) => a,
        Err(res) => return res,
    };
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("order"),
    };
    let reason = body.and_then(|Json(b)| b.reason);
    match services.cancel_order(id, actor, reason).await {
        Ok(view) => (StatusCode::OK, Json(dto::order_view_to_json(&view))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let actor = match guard_actor(&principal, &Permission::ORDERS_ADVANCE) {
        Ok(a) => a,
        Err(res) => return res,
    };
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("order"),
    };
    let to = match body.status() {
        Ok(s) => s,
        Err(e) => return errors::market_error_to_response(e),
    };
    match services.apply_transition(id, actor, to, body.notes).await {
        Ok(view) => (StatusCode::OK, Json(dto::order_view_to_json(&view))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}
