use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use fairmart_auth::Permission;

use crate::app::errors;
use crate::app::routes::common::guard_shop;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Dashboard counters for the caller's shop.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let shop_id = match guard_shop(&principal, &Permission::INVENTORY_READ) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.shop_summary(shop_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}
