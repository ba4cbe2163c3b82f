use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use fairmart_auth::Permission;
use fairmart_core::{ItemId, ShopId};
use fairmart_inventory::InventoryKey;

use crate::app::routes::common::guard_shop;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::InventoryQuery>,
) -> axum::response::Response {
    let shop_id = match guard_shop(&principal, &Permission::INVENTORY_READ) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let low_stock_only = query.low_stock.unwrap_or(false);
    match services.list_inventory(shop_id, low_stock_only).await {
        Ok(records) => {
            let items: Vec<_> = records.iter().map(dto::inventory_view_to_json).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "items": items,
                    "count": items.len(),
                    "low_stock_only": low_stock_only,
                })),
            )
                .into_response()
        }
        Err(e) => errors::market_error_to_response(e),
    }
}

/// Add (or, with `mode: "replace"`, overwrite) stock for one catalog item.
pub async fn upsert_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::UpsertStockRequest>,
) -> axum::response::Response {
    let shop_id = match guard_shop(&principal, &Permission::INVENTORY_WRITE) {
        Ok(id) => id,
        Err(res) => return res,
    };
    if let Some(raw) = body.shop_id.as_deref() {
        match raw.parse::<ShopId>() {
            Ok(id) if id == shop_id => {}
            Ok(_) => {
                return errors::json_error(
                    StatusCode::FORBIDDEN,
                    "forbidden",
                    "stock can only be managed for your own shop",
                )
            }
            Err(_) => return errors::invalid_id("shop"),
        }
    }

    let (item_id, upsert) = match body.into_upsert() {
        Ok(v) => v,
        Err(e) => return errors::market_error_to_response(e),
    };
    match services
        .upsert_stock(InventoryKey::new(shop_id, item_id), &upsert)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

/// Partial update; `is_active: false` takes the item off sale.
pub async fn adjust_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(item_id): Path<String>,
    Json(body): Json<dto::AdjustInventoryRequest>,
) -> axum::response::Response {
    let shop_id = match guard_shop(&principal, &Permission::INVENTORY_WRITE) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let item_id: ItemId = match item_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };
    let adjustment = match body.into_adjustment() {
        Ok(v) => v,
        Err(e) => return errors::market_error_to_response(e),
    };
    match services
        .adjust_stock(InventoryKey::new(shop_id, item_id), &adjustment)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}
