use axum::{
    routing::{get, patch, post, put},
    Router,
};

pub mod catalog;
pub mod common;
pub mod inventory;
pub mod orders;
pub mod shop;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/catalog/items", get(catalog::list_items))
        .route("/catalog/items/:id", get(catalog::get_item))
        .route(
            "/inventory",
            get(inventory::list_inventory).post(inventory::upsert_stock),
        )
        .route("/inventory/items/:item_id", patch(inventory::adjust_item))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/stats", get(orders::order_stats))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/orders/:id/status", put(orders::update_status))
        .route("/shop/summary", get(shop::summary))
}
