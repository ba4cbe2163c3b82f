//! Store selection and the facade route handlers call.
//!
//! One [`Marketplace`] per process, backed by either the in-memory store or
//! Postgres depending on configuration. Handlers never see which.

use std::path::Path;

use anyhow::Context;

use fairmart_core::{CustomerId, ItemId, OrderId, ShopId};
use fairmart_infra::store::{
    CatalogEntry, InMemoryStore, InventoryView, MarketSeed, OrderPage, OrderView, Pagination,
    PostgresStore, ShopSummary, Store,
};
use fairmart_infra::{AppConfig, MarketError, Marketplace, OrderDetail, ServiceSettings};
use fairmart_inventory::{InventoryAdjustment, InventoryKey, InventoryRecord, StockUpsert};
use fairmart_orders::{Actor, NewOrder, OrderStats, OrderStatus};

#[derive(Clone)]
pub enum AppServices {
    InMemory(Marketplace<InMemoryStore>),
    Persistent(Marketplace<PostgresStore>),
}

macro_rules! with_market {
    ($services:expr, $market:ident => $body:expr) => {
        match $services {
            AppServices::InMemory($market) => $body,
            AppServices::Persistent($market) => $body,
        }
    };
}

impl AppServices {
    pub fn in_memory(store: InMemoryStore, settings: ServiceSettings) -> Self {
        AppServices::InMemory(Marketplace::new(store, settings))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory(_) => "in_memory",
            AppServices::Persistent(_) => "postgres",
        }
    }

    pub async fn catalog_items(&self) -> Result<Vec<CatalogEntry>, MarketError> {
        with_market!(self, m => m.catalog_items().await)
    }

    pub async fn catalog_item(&self, id: ItemId) -> Result<CatalogEntry, MarketError> {
        with_market!(self, m => m.catalog_item(id).await)
    }

    pub async fn upsert_stock(
        &self,
        key: InventoryKey,
        upsert: &StockUpsert,
    ) -> Result<InventoryRecord, MarketError> {
        with_market!(self, m => m.ledger().upsert_stock(key, upsert).await)
    }

    pub async fn adjust_stock(
        &self,
        key: InventoryKey,
        adjustment: &InventoryAdjustment,
    ) -> Result<InventoryRecord, MarketError> {
        with_market!(self, m => m.ledger().adjust(key, adjustment).await)
    }

    pub async fn list_inventory(
        &self,
        shop_id: ShopId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryView>, MarketError> {
        with_market!(self, m => m.list_inventory(shop_id, low_stock_only).await)
    }

    pub async fn shop_summary(&self, shop_id: ShopId) -> Result<ShopSummary, MarketError> {
        with_market!(self, m => m.shop_summary(shop_id).await)
    }

    pub async fn place_order(&self, request: &NewOrder) -> Result<OrderView, MarketError> {
        with_market!(self, m => m.orders().place_order(request).await)
    }

    pub async fn apply_transition(
        &self,
        order_id: OrderId,
        actor: Actor,
        to: OrderStatus,
        notes: Option<String>,
    ) -> Result<OrderView, MarketError> {
        with_market!(self, m => m.status_machine().apply_transition(order_id, actor, to, notes).await)
    }

    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<OrderView, MarketError> {
        with_market!(self, m => m.status_machine().cancel(order_id, actor, reason).await)
    }

    pub async fn list_orders(
        &self,
        actor: Actor,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<OrderPage, MarketError> {
        with_market!(self, m => m.list_orders(actor, status, page).await)
    }

    pub async fn order_detail(&self, actor: Actor, id: OrderId) -> Result<OrderDetail, MarketError> {
        with_market!(self, m => m.order_detail(actor, id).await)
    }

    pub async fn customer_stats(&self, customer_id: CustomerId) -> Result<OrderStats, MarketError> {
        with_market!(self, m => m.customer_stats(customer_id).await)
    }
}

/// Build services from configuration.
///
/// `DATABASE_URL` (with persistent stores enabled) selects Postgres and runs
/// the embedded migration; otherwise everything lives in memory. The optional
/// seed is applied to whichever store was chosen.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let settings = ServiceSettings::from(config);

    let services = match &config.database {
        Some(database) => {
            let store = PostgresStore::connect(database)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to apply migrations")?;
            apply_seed(&store, config.seed_path.as_deref()).await?;
            AppServices::Persistent(Marketplace::new(store, settings))
        }
        None => {
            let store = InMemoryStore::new();
            apply_seed(&store, config.seed_path.as_deref()).await?;
            AppServices::InMemory(Marketplace::new(store, settings))
        }
    };

    tracing::info!(backend = services.backend(), "marketplace services ready");
    Ok(services)
}

async fn apply_seed<S: Store>(store: &S, path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let seed = MarketSeed::load(path).with_context(|| format!("failed to load seed {}", path.display()))?;
    seed.apply(store).await.context("failed to apply seed")?;
    Ok(())
}
