//! Inventory ledger domain rules.
//!
//! One stock counter per `(shop, item)` pair. Pure logic only; the atomic
//! check-and-decrement against shared storage lives in `fairmart-infra`.

pub mod record;

pub use record::{
    is_low_stock, InventoryAdjustment, InventoryKey, InventoryRecord, StockError, StockMode,
    StockUpsert, DEFAULT_LOW_STOCK_THRESHOLD,
};
