//! Storage seam.
//!
//! [`Store`] serves non-transactional reads and opens [`UnitOfWork`]s. A unit
//! of work is one database transaction: nothing it writes is visible until
//! [`UnitOfWork::commit`], and dropping it uncommitted rolls everything back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fairmart_catalog::{Category, Subcategory};
use fairmart_core::{CustomerId, ItemId, OrderId, ShopId};
use fairmart_inventory::{InventoryKey, InventoryRecord};
use fairmart_orders::{Order, OrderStatusEvent};

use crate::error::StoreError;

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod seed;

pub use in_memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PostgresStore, PostgresUnitOfWork};
pub use query::{
    CatalogEntry, CustomerProfile, InventoryView, OrderPage, OrderQuery, OrderScope, OrderView,
    Pagination, ShopProfile, ShopSummary,
};
pub use seed::{MarketSeed, SeedError};

/// Result of an atomic check-and-decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was decremented; carries the record as it is after the decrement.
    Reserved(InventoryRecord),
    Insufficient { available: u32 },
    /// No record for the pair, or the record is inactive.
    Unavailable,
}

#[async_trait]
pub trait UnitOfWork: Send {
    async fn subcategory(&mut self, id: ItemId) -> Result<Option<Subcategory>, StoreError>;

    /// Read a record and hold it against concurrent writers until commit.
    async fn lock_inventory_record(
        &mut self,
        key: InventoryKey,
    ) -> Result<Option<InventoryRecord>, StoreError>;

    /// Insert a brand-new record. Returns `false` when a concurrent writer
    /// created the pair first.
    async fn insert_inventory_record(&mut self, record: &InventoryRecord) -> Result<bool, StoreError>;

    async fn update_inventory_record(&mut self, record: &InventoryRecord) -> Result<(), StoreError>;

    /// `quantity -= n` only if the record is active and `quantity >= n`, as
    /// one step.
    async fn reserve_stock(
        &mut self,
        key: InventoryKey,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome, StoreError>;

    /// `quantity += n`. Returns `false` when the record does not exist and fails
    /// when the counter would pass `u32::MAX`.
    async fn release_stock(
        &mut self,
        key: InventoryKey,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Highest order sequence used in `year`, or 0.
    async fn last_order_sequence(&mut self, year: i32) -> Result<u32, StoreError>;

    /// Returns `false` when the order number is already taken.
    async fn insert_order(&mut self, order: &Order) -> Result<bool, StoreError>;

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Persist `status`, `cancellation_reason` and `updated_at`.
    async fn update_order_status(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn append_status_event(&mut self, event: &OrderStatusEvent) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn subcategory(&self, id: ItemId) -> Result<Option<CatalogEntry>, StoreError>;

    async fn list_subcategories(&self) -> Result<Vec<CatalogEntry>, StoreError>;

    /// Upsert an item and its category (price feed seam).
    async fn put_subcategory(&self, category: &Category, item: &Subcategory) -> Result<(), StoreError>;

    /// A shop's records. `low_stock_only` keeps active records at or under
    /// their threshold, most urgent first.
    async fn list_inventory(
        &self,
        shop_id: ShopId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryView>, StoreError>;

    async fn order_view(&self, id: OrderId) -> Result<Option<OrderView>, StoreError>;

    /// Newest first.
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, StoreError>;

    /// Oldest first.
    async fn status_history(&self, id: OrderId) -> Result<Vec<OrderStatusEvent>, StoreError>;

    async fn customer_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, StoreError>;

    async fn put_customer(&self, profile: &CustomerProfile) -> Result<(), StoreError>;

    async fn put_shop(&self, profile: &ShopProfile) -> Result<(), StoreError>;
}
