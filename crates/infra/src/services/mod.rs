//! Marketplace application services.
//!
//! Services orchestrate the pure domain crates against a [`Store`]. Every
//! write runs inside one [`UnitOfWork`](crate::store::UnitOfWork), wrapped in
//! the configured [`RetryPolicy`], so a transient storage failure replays the
//! whole unit rather than resuming half-way.
//!
//! ## Placement Flow
//!
//! ```text
//! NewOrder
//!   ↓
//! 1. Validate request (no IO)
//!   ↓
//! 2. Reserve stock: atomic check-and-decrement on (shop, item)
//!   ↓
//! 3. Check the snapshotted unit price against the item's band
//!   ↓
//! 4. Allocate ORD-<year>-<seq>, retrying on collision
//!   ↓
//! 5. Insert order + `null → pending` event, commit
//! ```
//!
//! ## Transition Flow
//!
//! ```text
//! lock order → ownership check → lifecycle/role check → update status
//!   → append event → release stock if cancelled → commit
//! ```

use std::sync::Arc;

use chrono::Utc;

use fairmart_core::{CustomerId, ItemId, OrderId, ShopId};
use fairmart_orders::{Actor, Order, OrderStats, OrderStatus, OrderStatusEvent, DEFAULT_DELIVERY_DAYS};

use crate::config::AppConfig;
use crate::error::MarketError;
use crate::retry::RetryPolicy;
use crate::store::{
    CatalogEntry, InventoryView, OrderPage, OrderQuery, OrderScope, OrderView, Pagination,
    ShopSummary, Store,
};

pub mod ledger;
pub mod orders;
pub mod reconciler;
pub mod status;

pub use ledger::InventoryLedger;
pub use orders::OrderManager;
pub use reconciler::InventoryReconciler;
pub use status::StatusMachine;

/// Tunables shared by the write paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub order_number_attempts: u32,
    pub delivery_days: u32,
    pub retry: RetryPolicy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            order_number_attempts: 20,
            delivery_days: DEFAULT_DELIVERY_DAYS,
            retry: RetryPolicy::no_retry(),
        }
    }
}

impl From<&AppConfig> for ServiceSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            order_number_attempts: config.order_number_attempts,
            delivery_days: config.estimated_delivery_days,
            retry: config.retry.clone(),
        }
    }
}

/// An order together with its status trail, oldest event first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub view: OrderView,
    pub history: Vec<OrderStatusEvent>,
}

/// Facade over one store: the write-side components plus the read queries.
pub struct Marketplace<S: Store> {
    store: Arc<S>,
    settings: ServiceSettings,
}

impl<S: Store> Clone for Marketplace<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: Store> Marketplace<S> {
    pub fn new(store: S, settings: ServiceSettings) -> Self {
        Self {
            store: Arc::new(store),
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn ledger(&self) -> InventoryLedger<'_, S> {
        InventoryLedger::new(&self.store, &self.settings.retry)
    }

    pub fn orders(&self) -> OrderManager<'_, S> {
        OrderManager::new(&self.store, &self.settings)
    }

    pub fn status_machine(&self) -> StatusMachine<'_, S> {
        StatusMachine::new(&self.store, &self.settings.retry)
    }

    pub async fn catalog_items(&self) -> Result<Vec<CatalogEntry>, MarketError> {
        Ok(self.store.list_subcategories().await?)
    }

    pub async fn catalog_item(&self, id: ItemId) -> Result<CatalogEntry, MarketError> {
        self.store
            .subcategory(id)
            .await?
            .ok_or(MarketError::ProductUnavailable)
    }

    pub async fn list_inventory(
        &self,
        shop_id: ShopId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryView>, MarketError> {
        Ok(self.store.list_inventory(shop_id, low_stock_only).await?)
    }

    pub async fn shop_summary(&self, shop_id: ShopId) -> Result<ShopSummary, MarketError> {
        let records = self.store.list_inventory(shop_id, false).await?;
        let active = records.iter().filter(|v| v.record.is_active());
        let total_products = active.clone().count() as u64;
        let low_stock_products = active.filter(|v| v.record.is_low_stock()).count() as u64;

        let pending = self
            .store
            .list_orders(&OrderQuery {
                scope: OrderScope::Shop(shop_id),
                status: Some(OrderStatus::Pending),
                page: Pagination::new(Some(1), Some(1)),
            })
            .await?;

        Ok(ShopSummary {
            total_products,
            low_stock_products,
            pending_orders: pending.total,
        })
    }

    /// Orders visible to `actor`, newest first.
    pub async fn list_orders(
        &self,
        actor: Actor,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<OrderPage, MarketError> {
        let query = OrderQuery {
            scope: actor.into(),
            status,
            page,
        };
        Ok(self.store.list_orders(&query).await?)
    }

    /// Orders outside the actor's ownership are reported as missing.
    pub async fn order_detail(&self, actor: Actor, id: OrderId) -> Result<OrderDetail, MarketError> {
        let view = self
            .store
            .order_view(id)
            .await?
            .filter(|v| v.order.is_visible_to(&actor))
            .ok_or(MarketError::OrderNotFound)?;
        let history = self.store.status_history(id).await?;
        Ok(OrderDetail { view, history })
    }

    pub async fn customer_stats(&self, customer_id: CustomerId) -> Result<OrderStats, MarketError> {
        let orders = self.store.customer_orders(customer_id).await?;
        Ok(OrderStats::compute(&orders, Utc::now()))
    }
}

/// Join display fields onto a freshly written order. The write already
/// committed, so a failed lookup degrades to the bare order.
async fn present<S: Store>(store: &S, order: Order) -> OrderView {
    match store.order_view(order.id()).await {
        Ok(Some(view)) => view,
        Ok(None) => bare_view(order),
        Err(err) => {
            tracing::warn!(order_id = %order.id(), error = %err, "order view lookup failed");
            bare_view(order)
        }
    }
}

fn bare_view(order: Order) -> OrderView {
    OrderView {
        order,
        item_name: None,
        unit: None,
        shop: None,
        customer: None,
    }
}

/// Log a failed operation at the level its error class warrants.
fn log_failure(operation: &'static str, err: &MarketError) {
    match err {
        MarketError::Storage(_) | MarketError::OrderNumberExhausted { .. } => {
            tracing::error!(operation, code = err.code(), error = %err, "operation failed")
        }
        MarketError::TransientFailure(_) => {
            tracing::warn!(operation, code = err.code(), error = %err, "operation failed")
        }
        _ => tracing::debug!(operation, code = err.code(), error = %err, "request rejected"),
    }
}
