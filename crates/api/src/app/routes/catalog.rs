use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use fairmart_auth::Permission;
use fairmart_core::ItemId;

use crate::app::routes::common::guard;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(res) = guard(&principal, &Permission::CATALOG_READ) {
        return res;
    }
    match services.catalog_items().await {
        Ok(items) => {
            let items: Vec<_> = items.iter().map(dto::catalog_entry_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = guard(&principal, &Permission::CATALOG_READ) {
        return res;
    }
    let id: ItemId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };
    match services.catalog_item(id).await {
        Ok(entry) => (StatusCode::OK, Json(dto::catalog_entry_to_json(&entry))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}
