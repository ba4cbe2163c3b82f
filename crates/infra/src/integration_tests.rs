//! Integration tests for the marketplace write paths.
//!
//! Tests: Marketplace services → UnitOfWork → InMemoryStore
//!
//! Verifies:
//! - Concurrent placements never oversell a (shop, item) pair
//! - Cancellation restores stock exactly once
//! - Order prices are frozen at placement
//! - Failed units of work leave no partial state
//! - Transient failures are retried

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{Datelike, Utc};

    use fairmart_catalog::{Category, PriceBand, PriceBound, Subcategory};
    use fairmart_core::{CategoryId, CustomerId, ItemId, Money, OrderId, ShopId};
    use fairmart_inventory::{InventoryKey, StockMode, StockUpsert};
    use fairmart_orders::{Actor, NewOrder, Order, OrderNumber, OrderStatus, OrderStatusEvent};

    use crate::error::{MarketError, StoreError};
    use crate::retry::RetryPolicy;
    use crate::services::{Marketplace, ServiceSettings};
    use crate::store::{
        CatalogEntry, CustomerProfile, InMemoryStore, InMemoryUnitOfWork, InventoryView, OrderPage,
        OrderQuery, OrderView, Pagination, ShopProfile, Store, UnitOfWork,
    };

    struct Fixture {
        market: Marketplace<InMemoryStore>,
        category: Category,
        item: Subcategory,
        key: InventoryKey,
        customer: CustomerId,
    }

    fn test_upsert(quantity: u32, price: u64) -> StockUpsert {
        StockUpsert {
            quantity,
            unit_price: Money::new(price),
            low_stock_threshold: None,
            mode: StockMode::Add,
        }
    }

    async fn setup(stock: u32, price: u64) -> Fixture {
        setup_with(stock, price, PriceBand::new(Some(Money::new(40)), Some(Money::new(60)))).await
    }

    async fn setup_with(stock: u32, price: u64, band: PriceBand) -> Fixture {
        let market = Marketplace::new(InMemoryStore::new(), ServiceSettings::default());
        let category = Category {
            id: CategoryId::new(),
            name: "Rice".into(),
        };
        let item = Subcategory {
            id: ItemId::new(),
            category_id: category.id,
            name: "Miniket rice".into(),
            unit: "kg".into(),
            band,
        };
        market.store().put_subcategory(&category, &item).await.unwrap();
        let key = InventoryKey::new(ShopId::new(), item.id);
        market
            .ledger()
            .upsert_stock(key, &test_upsert(stock, price))
            .await
            .unwrap();
        Fixture {
            market,
            category,
            item,
            key,
            customer: CustomerId::new(),
        }
    }

    fn order_request(fx: &Fixture, customer: CustomerId, quantity: u32) -> NewOrder {
        NewOrder {
            customer_id: customer,
            shop_id: fx.key.shop_id,
            item_id: fx.key.item_id,
            quantity,
            delivery_address: "House 12, Mirpur".into(),
            delivery_phone: "01712345678".into(),
            notes: None,
        }
    }

    async fn stock_of(fx: &Fixture) -> u32 {
        fx.market.store().inventory_record(fx.key).await.unwrap().quantity()
    }

    #[tokio::test]
    async fn concurrent_placements_never_oversell() {
        let fx = setup(10, 50).await;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let market = fx.market.clone();
            let request = order_request(&fx, CustomerId::new(), 3);
            handles.push(tokio::spawn(async move {
                market.orders().place_order(&request).await
            }));
        }

        let mut reserved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(view) => reserved += view.order.quantity(),
                Err(MarketError::InsufficientStock { requested, .. }) => assert_eq!(requested, 3),
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(reserved, 9);
        assert_eq!(stock_of(&fx).await, 1);
        assert_eq!(fx.market.store().order_count().await, 3);
    }

    #[tokio::test]
    async fn reserve_then_cancel_restores_stock() {
        let fx = setup(10, 50).await;
        let first = fx
            .market
            .orders()
            .place_order(&order_request(&fx, fx.customer, 7))
            .await
            .unwrap();
        assert_eq!(stock_of(&fx).await, 3);

        let err = fx
            .market
            .orders()
            .place_order(&order_request(&fx, CustomerId::new(), 5))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            MarketError::InsufficientStock {
                available: 3,
                requested: 5
            }
        );

        fx.market
            .status_machine()
            .cancel(first.order.id(), Actor::Customer(fx.customer), None)
            .await
            .unwrap();
        assert_eq!(stock_of(&fx).await, 10);
    }

    #[tokio::test]
    async fn second_cancellation_is_rejected_without_release() {
        let fx = setup(10, 50).await;
        let placed = fx
            .market
            .orders()
            .place_order(&order_request(&fx, fx.customer, 4))
            .await
            .unwrap();
        let id = placed.order.id();
        let actor = Actor::Customer(fx.customer);

        let cancelled = fx
            .market
            .status_machine()
            .cancel(id, actor, Some("Changed my mind".into()))
            .await
            .unwrap();
        assert_eq!(cancelled.order.cancellation_reason(), Some("Changed my mind"));

        let err = fx.market.status_machine().cancel(id, actor, None).await.unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
        assert_eq!(stock_of(&fx).await, 10);

        let history = fx.market.store().status_history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].new_status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn order_price_is_frozen_at_placement() {
        let fx = setup(10, 50).await;
        let placed = fx
            .market
            .orders()
            .place_order(&order_request(&fx, fx.customer, 2))
            .await
            .unwrap();
        assert_eq!(placed.order.total_amount(), Money::new(100));

        fx.market
            .ledger()
            .upsert_stock(fx.key, &test_upsert(0, 58))
            .await
            .unwrap();

        let detail = fx
            .market
            .order_detail(Actor::Customer(fx.customer), placed.order.id())
            .await
            .unwrap();
        assert_eq!(detail.view.order.unit_price(), Money::new(50));
        assert_eq!(detail.view.order.total_amount(), Money::new(100));
    }

    #[tokio::test]
    async fn band_bounds_are_inclusive() {
        let fx = setup(1, 50).await;
        let ledger = fx.market.ledger();

        let err = ledger.upsert_stock(fx.key, &test_upsert(1, 39)).await.unwrap_err();
        assert_eq!(err.violated_bound(), Some((PriceBound::Min, Money::new(40))));
        let err = ledger.upsert_stock(fx.key, &test_upsert(1, 61)).await.unwrap_err();
        assert_eq!(err.violated_bound(), Some((PriceBound::Max, Money::new(60))));

        assert!(ledger.upsert_stock(fx.key, &test_upsert(1, 40)).await.is_ok());
        assert!(ledger.upsert_stock(fx.key, &test_upsert(1, 60)).await.is_ok());
        assert_eq!(stock_of(&fx).await, 3);
    }

    #[tokio::test]
    async fn tightened_band_blocks_placement_and_rolls_back_reservation() {
        let fx = setup(10, 50).await;
        let tightened = Subcategory {
            band: PriceBand::new(None, Some(Money::new(45))),
            ..fx.item.clone()
        };
        fx.market
            .store()
            .put_subcategory(&fx.category, &tightened)
            .await
            .unwrap();

        let err = fx
            .market
            .orders()
            .place_order(&order_request(&fx, fx.customer, 2))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "price_out_of_range");
        assert_eq!(stock_of(&fx).await, 10);
        assert_eq!(fx.market.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn exhausted_numbers_roll_back_the_reservation() {
        let fx = setup(10, 50).await;
        let now = Utc::now();
        let last = OrderNumber::new(now.year(), OrderNumber::MAX_SEQUENCE).unwrap();
        let (existing, event) =
            Order::place(&order_request(&fx, CustomerId::new(), 1), last, Money::new(50), 3, now).unwrap();
        let mut tx = fx.market.store().begin().await.unwrap();
        assert!(tx.insert_order(&existing).await.unwrap());
        tx.append_status_event(&event).await.unwrap();
        tx.commit().await.unwrap();

        let err = fx
            .market
            .orders()
            .place_order(&order_request(&fx, fx.customer, 3))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::OrderNumberExhausted { year: now.year() });
        assert_eq!(stock_of(&fx).await, 10);
        assert_eq!(fx.market.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn order_numbers_are_sequential_within_a_year() {
        let fx = setup(10, 50).await;
        let year = Utc::now().year();
        let mut numbers = Vec::new();
        for _ in 0..3 {
            let view = fx
                .market
                .orders()
                .place_order(&order_request(&fx, fx.customer, 1))
                .await
                .unwrap();
            numbers.push(view.order.order_number().to_string());
        }
        assert_eq!(
            numbers,
            vec![
                format!("ORD-{year}-000001"),
                format!("ORD-{year}-000002"),
                format!("ORD-{year}-000003"),
            ]
        );
    }

    #[tokio::test]
    async fn other_parties_see_order_not_found() {
        let fx = setup(10, 50).await;
        let placed = fx
            .market
            .orders()
            .place_order(&order_request(&fx, fx.customer, 1))
            .await
            .unwrap();
        let id = placed.order.id();

        let stranger = Actor::Customer(CustomerId::new());
        let other_shop = Actor::ShopOwner(ShopId::new());
        assert_eq!(
            fx.market.order_detail(stranger, id).await.unwrap_err(),
            MarketError::OrderNotFound
        );
        assert_eq!(
            fx.market.status_machine().cancel(id, other_shop, None).await.unwrap_err(),
            MarketError::OrderNotFound
        );
        assert_eq!(
            fx.market
                .status_machine()
                .cancel(OrderId::new(), Actor::System, None)
                .await
                .unwrap_err(),
            MarketError::OrderNotFound
        );
        assert_eq!(stock_of(&fx).await, 9);
    }

    #[tokio::test]
    async fn customers_may_only_cancel() {
        let fx = setup(10, 50).await;
        let placed = fx
            .market
            .orders()
            .place_order(&order_request(&fx, fx.customer, 1))
            .await
            .unwrap();
        let err = fx
            .market
            .status_machine()
            .apply_transition(
                placed.order.id(),
                Actor::Customer(fx.customer),
                OrderStatus::Confirmed,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.allowed_statuses().unwrap(), &[OrderStatus::Cancelled]);

        let confirmed = fx
            .market
            .status_machine()
            .apply_transition(placed.order.id(), Actor::System, OrderStatus::Confirmed, None)
            .await
            .unwrap();
        assert_eq!(confirmed.order.status(), OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn invalid_requests_touch_nothing() {
        let fx = setup(10, 50).await;
        let mut request = order_request(&fx, fx.customer, 0);
        assert_eq!(
            fx.market.orders().place_order(&request).await.unwrap_err().code(),
            "invalid_request"
        );
        request.quantity = 1;
        request.delivery_phone = "  ".into();
        assert_eq!(
            fx.market.orders().place_order(&request).await.unwrap_err().code(),
            "invalid_request"
        );
        request.delivery_phone = "01712345678".into();
        request.shop_id = ShopId::new();
        assert_eq!(
            fx.market.orders().place_order(&request).await.unwrap_err(),
            MarketError::ProductUnavailable
        );
        assert_eq!(stock_of(&fx).await, 10);
    }

    #[tokio::test]
    async fn listings_are_scoped_and_paginated() {
        let fx = setup(20, 50).await;
        let other = CustomerId::new();
        for _ in 0..3 {
            fx.market
                .orders()
                .place_order(&order_request(&fx, fx.customer, 1))
                .await
                .unwrap();
        }
        let theirs = fx
            .market
            .orders()
            .place_order(&order_request(&fx, other, 2))
            .await
            .unwrap();
        fx.market
            .status_machine()
            .cancel(theirs.order.id(), Actor::Customer(other), None)
            .await
            .unwrap();

        let mine = fx
            .market
            .list_orders(Actor::Customer(fx.customer), None, Pagination::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(mine.total, 3);
        assert_eq!(mine.items.len(), 2);
        assert!(mine.has_more);
        assert!(mine.items.iter().all(|v| v.order.customer_id() == fx.customer));

        let shop = Actor::ShopOwner(fx.key.shop_id);
        let cancelled = fx
            .market
            .list_orders(shop, Some(OrderStatus::Cancelled), Pagination::default())
            .await
            .unwrap();
        assert_eq!(cancelled.total, 1);
        assert_eq!(cancelled.items[0].order.id(), theirs.order.id());

        let summary = fx.market.shop_summary(fx.key.shop_id).await.unwrap();
        assert_eq!(summary.total_products, 1);
        assert_eq!(summary.pending_orders, 3);
        assert_eq!(summary.low_stock_products, 0);

        let stats = fx.market.customer_stats(other).await.unwrap();
        assert_eq!(stats.total_orders, 1);
        assert_eq!(stats.by_status.cancelled, 1);
        assert_eq!(stats.total_spent, Money::ZERO);
    }

    /// Fails the first `failures` attempts to open a unit of work.
    struct FlakyStore {
        inner: InMemoryStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl Store for FlakyStore {
        type Tx = InMemoryUnitOfWork;

        async fn begin(&self) -> Result<Self::Tx, StoreError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::transient("begin_transaction", "could not obtain lock"));
            }
            self.inner.begin().await
        }
        async fn subcategory(&self, id: ItemId) -> Result<Option<CatalogEntry>, StoreError> {
            self.inner.subcategory(id).await
        }
        async fn list_subcategories(&self) -> Result<Vec<CatalogEntry>, StoreError> {
            self.inner.list_subcategories().await
        }
        async fn put_subcategory(&self, category: &Category, item: &Subcategory) -> Result<(), StoreError> {
            self.inner.put_subcategory(category, item).await
        }
        async fn list_inventory(&self, shop_id: ShopId, low: bool) -> Result<Vec<InventoryView>, StoreError> {
            self.inner.list_inventory(shop_id, low).await
        }
        async fn order_view(&self, id: OrderId) -> Result<Option<OrderView>, StoreError> {
            self.inner.order_view(id).await
        }
        async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, StoreError> {
            self.inner.list_orders(query).await
        }
        async fn status_history(&self, id: OrderId) -> Result<Vec<OrderStatusEvent>, StoreError> {
            self.inner.status_history(id).await
        }
        async fn customer_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, StoreError> {
            self.inner.customer_orders(customer_id).await
        }
        async fn put_customer(&self, profile: &CustomerProfile) -> Result<(), StoreError> {
            self.inner.put_customer(profile).await
        }
        async fn put_shop(&self, profile: &ShopProfile) -> Result<(), StoreError> {
            self.inner.put_shop(profile).await
        }
    }

    async fn flaky_market(failures: u32, max_attempts: u32) -> (Marketplace<FlakyStore>, ItemId) {
        let store = FlakyStore {
            inner: InMemoryStore::new(),
            failures: AtomicU32::new(0),
        };
        let category = Category {
            id: CategoryId::new(),
            name: "Oil".into(),
        };
        let item = Subcategory {
            id: ItemId::new(),
            category_id: category.id,
            name: "Soybean oil".into(),
            unit: "litre".into(),
            band: PriceBand::unbounded(),
        };
        store.put_subcategory(&category, &item).await.unwrap();
        store.failures.store(failures, Ordering::SeqCst);
        let settings = ServiceSettings {
            retry: RetryPolicy::fixed(max_attempts, Duration::from_millis(1)),
            ..ServiceSettings::default()
        };
        (Marketplace::new(store, settings), item.id)
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (market, item_id) = flaky_market(2, 3).await;
        let key = InventoryKey::new(ShopId::new(), item_id);
        let record = market.ledger().upsert_stock(key, &test_upsert(5, 170)).await.unwrap();
        assert_eq!(record.quantity(), 5);
        assert_eq!(market.store().failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_transient_failure() {
        let (market, item_id) = flaky_market(5, 2).await;
        let key = InventoryKey::new(ShopId::new(), item_id);
        let err = market
            .ledger()
            .upsert_stock(key, &test_upsert(5, 170))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(market.store().inner.inventory_record(key).await.is_none());
    }
}
