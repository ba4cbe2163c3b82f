use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use fairmart_catalog::{Category, Subcategory};
use fairmart_core::{CategoryId, CustomerId, ItemId, OrderId, ShopId};
use fairmart_inventory::{InventoryKey, InventoryRecord, StockError};
use fairmart_orders::{Order, OrderNumber, OrderStatusEvent};

use crate::error::StoreError;
use crate::store::{
    CatalogEntry, CustomerProfile, InventoryView, OrderPage, OrderQuery, OrderView, ReserveOutcome,
    ShopProfile, Store, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct MarketState {
    categories: HashMap<CategoryId, Category>,
    items: HashMap<ItemId, Subcategory>,
    inventory: HashMap<InventoryKey, InventoryRecord>,
    orders: HashMap<OrderId, Order>,
    order_numbers: HashSet<OrderNumber>,
    history: Vec<OrderStatusEvent>,
    customers: HashMap<CustomerId, CustomerProfile>,
    shops: HashMap<ShopId, ShopProfile>,
}

impl MarketState {
    fn catalog_entry(&self, item: &Subcategory) -> CatalogEntry {
        CatalogEntry {
            item: item.clone(),
            category_name: self.categories.get(&item.category_id).map(|c| c.name.clone()),
        }
    }

    fn order_view(&self, order: &Order) -> OrderView {
        let item = self.items.get(&order.item_id());
        OrderView {
            order: order.clone(),
            item_name: item.map(|i| i.name.clone()),
            unit: item.map(|i| i.unit.clone()),
            shop: self.shops.get(&order.shop_id()).cloned(),
            customer: self.customers.get(&order.customer_id()).cloned(),
        }
    }
}

/// In-memory store for tests and local runs.
///
/// Units of work are serialized behind one async mutex and write to a staged
/// copy of the state, so an uncommitted unit of work leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MarketState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct record lookup outside any unit of work.
    pub async fn inventory_record(&self, key: InventoryKey) -> Option<InventoryRecord> {
        self.state.lock().await.inventory.get(&key).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<MarketState>,
    staged: MarketState,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn subcategory(&mut self, id: ItemId) -> Result<Option<Subcategory>, StoreError> {
        Ok(self.staged.items.get(&id).cloned())
    }

    async fn lock_inventory_record(
        &mut self,
        key: InventoryKey,
    ) -> Result<Option<InventoryRecord>, StoreError> {
        Ok(self.staged.inventory.get(&key).cloned())
    }

    async fn insert_inventory_record(&mut self, record: &InventoryRecord) -> Result<bool, StoreError> {
        if self.staged.inventory.contains_key(&record.key()) {
            return Ok(false);
        }
        self.staged.inventory.insert(record.key(), record.clone());
        Ok(true)
    }

    async fn update_inventory_record(&mut self, record: &InventoryRecord) -> Result<(), StoreError> {
        self.staged.inventory.insert(record.key(), record.clone());
        Ok(())
    }

    async fn reserve_stock(
        &mut self,
        key: InventoryKey,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome, StoreError> {
        let Some(record) = self.staged.inventory.get_mut(&key) else {
            return Ok(ReserveOutcome::Unavailable);
        };
        match record.reserve(quantity, now) {
            Ok(()) => Ok(ReserveOutcome::Reserved(record.clone())),
            Err(StockError::Insufficient { available, .. }) => {
                Ok(ReserveOutcome::Insufficient { available })
            }
            Err(StockError::Inactive) => Ok(ReserveOutcome::Unavailable),
            Err(other) => Err(StoreError::backend("reserve_stock", other.to_string())),
        }
    }

    async fn release_stock(
        &mut self,
        key: InventoryKey,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(record) = self.staged.inventory.get_mut(&key) else {
            return Ok(false);
        };
        record
            .release(quantity, now)
            .map_err(|e| StoreError::backend("release_stock", e.to_string()))?;
        Ok(true)
    }

    async fn last_order_sequence(&mut self, year: i32) -> Result<u32, StoreError> {
        Ok(self
            .staged
            .order_numbers
            .iter()
            .filter(|n| n.year() == year)
            .map(|n| n.sequence())
            .max()
            .unwrap_or(0))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<bool, StoreError> {
        if !self.staged.order_numbers.insert(order.order_number()) {
            return Ok(false);
        }
        self.staged.orders.insert(order.id(), order.clone());
        Ok(true)
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<(), StoreError> {
        match self.staged.orders.get_mut(&order.id()) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::backend("update_order_status", "order does not exist")),
        }
    }

    async fn append_status_event(&mut self, event: &OrderStatusEvent) -> Result<(), StoreError> {
        if !self.staged.orders.contains_key(&event.order_id) {
            return Err(StoreError::backend("append_status_event", "order does not exist"));
        }
        self.staged.history.push(event.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}

fn by_urgency(a: &InventoryView, b: &InventoryView) -> Ordering {
    a.record
        .stock_ratio()
        .partial_cmp(&b.record.stock_ratio())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.item_name.cmp(&b.item_name))
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryUnitOfWork { guard, staged })
    }

    async fn subcategory(&self, id: ItemId) -> Result<Option<CatalogEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.items.get(&id).map(|item| state.catalog_entry(item)))
    }

    async fn list_subcategories(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let state = self.state.lock().await;
        let mut out: Vec<CatalogEntry> = state.items.values().map(|i| state.catalog_entry(i)).collect();
        out.sort_by(|a, b| {
            a.category_name
                .cmp(&b.category_name)
                .then_with(|| a.item.name.cmp(&b.item.name))
        });
        Ok(out)
    }

    async fn put_subcategory(&self, category: &Category, item: &Subcategory) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.categories.insert(category.id, category.clone());
        state.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn list_inventory(
        &self,
        shop_id: ShopId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryView>, StoreError> {
        let state = self.state.lock().await;
        let mut out: Vec<InventoryView> = state
            .inventory
            .values()
            .filter(|r| r.shop_id() == shop_id)
            .filter(|r| !low_stock_only || (r.is_active() && r.is_low_stock()))
            .map(|r| {
                let item = state.items.get(&r.item_id());
                InventoryView {
                    record: r.clone(),
                    item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    unit: item.map(|i| i.unit.clone()).unwrap_or_default(),
                    category_name: item
                        .and_then(|i| state.categories.get(&i.category_id))
                        .map(|c| c.name.clone()),
                }
            })
            .collect();
        if low_stock_only {
            out.sort_by(by_urgency);
        } else {
            out.sort_by(|a, b| a.item_name.cmp(&b.item_name));
        }
        Ok(out)
    }

    async fn order_view(&self, id: OrderId) -> Result<Option<OrderView>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|o| state.order_view(o)))
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, StoreError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&Order> = state.orders.values().filter(|o| query.matches(o)).collect();
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.page.offset()).unwrap_or(usize::MAX))
            .take(query.page.limit as usize)
            .map(|o| state.order_view(o))
            .collect();
        Ok(OrderPage::new(items, query.page, total))
    }

    async fn status_history(&self, id: OrderId) -> Result<Vec<OrderStatusEvent>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .filter(|e| e.order_id == id)
            .cloned()
            .collect())
    }

    async fn customer_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.customer_id() == customer_id)
            .cloned()
            .collect())
    }

    async fn put_customer(&self, profile: &CustomerProfile) -> Result<(), StoreError> {
        self.state.lock().await.customers.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn put_shop(&self, profile: &ShopProfile) -> Result<(), StoreError> {
        self.state.lock().await.shops.insert(profile.id, profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairmart_catalog::PriceBand;
    use fairmart_core::Money;
    use fairmart_inventory::{StockMode, StockUpsert};

    fn test_key() -> InventoryKey {
        InventoryKey::new(ShopId::new(), ItemId::new())
    }

    fn test_record(key: InventoryKey, quantity: u32) -> InventoryRecord {
        InventoryRecord::create(
            key,
            &StockUpsert {
                quantity,
                unit_price: Money::new(50),
                low_stock_threshold: Some(2),
                mode: StockMode::Add,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn dropped_unit_of_work_leaves_no_trace() {
        let store = InMemoryStore::new();
        let key = test_key();
        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.insert_inventory_record(&test_record(key, 5)).await.unwrap());
        }
        assert!(store.inventory_record(key).await.is_none());

        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory_record(&test_record(key, 5)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.inventory_record(key).await.unwrap().quantity(), 5);
    }

    #[tokio::test]
    async fn reserve_outcomes() {
        let store = InMemoryStore::new();
        let key = test_key();
        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory_record(&test_record(key, 3)).await.unwrap();

        let now = Utc::now();
        assert_eq!(
            tx.reserve_stock(key, 5, now).await.unwrap(),
            ReserveOutcome::Insufficient { available: 3 }
        );
        match tx.reserve_stock(key, 2, now).await.unwrap() {
            ReserveOutcome::Reserved(rec) => assert_eq!(rec.quantity(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            tx.reserve_stock(test_key(), 1, now).await.unwrap(),
            ReserveOutcome::Unavailable
        );
    }

    #[tokio::test]
    async fn release_past_counter_limit_is_rejected() {
        let store = InMemoryStore::new();
        let key = test_key();
        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory_record(&test_record(key, u32::MAX - 2)).await.unwrap();

        assert!(tx.release_stock(key, 5, Utc::now()).await.is_err());
        assert!(tx.release_stock(key, 2, Utc::now()).await.unwrap());
        assert!(!tx.release_stock(test_key(), 1, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn low_stock_listing_is_sorted_by_ratio() {
        let store = InMemoryStore::new();
        let shop = ShopId::new();
        let category = Category {
            id: CategoryId::new(),
            name: "Staples".into(),
        };
        let mut tx = store.begin().await.unwrap();
        for (name, qty) in [("Sugar", 2u32), ("Rice", 0), ("Salt", 9)] {
            let item = Subcategory {
                id: ItemId::new(),
                category_id: category.id,
                name: name.into(),
                unit: "kg".into(),
                band: PriceBand::unbounded(),
            };
            tx.staged.items.insert(item.id, item.clone());
            tx.staged.categories.insert(category.id, category.clone());
            tx.insert_inventory_record(&test_record(InventoryKey::new(shop, item.id), qty))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let low = store.list_inventory(shop, true).await.unwrap();
        let names: Vec<&str> = low.iter().map(|v| v.item_name.as_str()).collect();
        assert_eq!(names, vec!["Rice", "Sugar"]);
        assert_eq!(low[0].category_name.as_deref(), Some("Staples"));
        assert_eq!(store.list_inventory(shop, false).await.unwrap().len(), 3);
    }
}
