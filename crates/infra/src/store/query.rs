//! Read-side query and view types.

use serde::{Deserialize, Serialize};

use fairmart_catalog::Subcategory;
use fairmart_core::{CustomerId, ShopId};
use fairmart_inventory::InventoryRecord;
use fairmart_orders::{Actor, Order, OrderStatus};

/// Page request for order listings (1-based pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Out-of-range values are clamped rather than rejected.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Whose orders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Customer(CustomerId),
    Shop(ShopId),
    All,
}

impl From<Actor> for OrderScope {
    fn from(actor: Actor) -> Self {
        match actor {
            Actor::Customer(id) => OrderScope::Customer(id),
            Actor::ShopOwner(id) => OrderScope::Shop(id),
            Actor::System => OrderScope::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuery {
    pub scope: OrderScope,
    pub status: Option<OrderStatus>,
    pub page: Pagination,
}

impl OrderQuery {
    pub fn matches(&self, order: &Order) -> bool {
        let in_scope = match self.scope {
            OrderScope::Customer(id) => order.customer_id() == id,
            OrderScope::Shop(id) => order.shop_id() == id,
            OrderScope::All => true,
        };
        in_scope && self.status.is_none_or(|s| order.status() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopProfile {
    pub id: ShopId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Catalog item with its category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub item: Subcategory,
    pub category_name: Option<String>,
}

/// Inventory record joined with catalog display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryView {
    pub record: InventoryRecord,
    pub item_name: String,
    pub unit: String,
    pub category_name: Option<String>,
}

/// Order joined with item, shop and customer display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub order: Order,
    pub item_name: Option<String>,
    pub unit: Option<String>,
    pub shop: Option<ShopProfile>,
    pub customer: Option<CustomerProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    pub items: Vec<OrderView>,
    pub page: Pagination,
    pub total: u64,
    pub has_more: bool,
}

impl OrderPage {
    pub fn new(items: Vec<OrderView>, page: Pagination, total: u64) -> Self {
        let has_more = page.offset() + (items.len() as u64) < total;
        Self {
            items,
            page,
            total,
            has_more,
        }
    }
}

/// Dashboard counters for one shop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSummary {
    pub total_products: u64,
    pub low_stock_products: u64,
    pub pending_orders: u64,
}
