//! Order placement.

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, error, info, instrument};

use fairmart_core::Money;
use fairmart_inventory::InventoryKey;
use fairmart_orders::{NewOrder, Order, OrderNumber};

use crate::error::MarketError;
use crate::services::ledger::reserve_in;
use crate::services::{log_failure, present, ServiceSettings};
use crate::store::{OrderView, Store, UnitOfWork};

pub struct OrderManager<'a, S: Store> {
    store: &'a S,
    settings: &'a ServiceSettings,
}

impl<'a, S: Store> OrderManager<'a, S> {
    pub fn new(store: &'a S, settings: &'a ServiceSettings) -> Self {
        Self { store, settings }
    }

    /// Reserve stock and create a `pending` order in one unit of work.
    ///
    /// Either both the decrement and the order (with its first status
    /// event) persist, or neither does.
    #[instrument(
        skip(self, request),
        fields(
            customer_id = %request.customer_id,
            shop_id = %request.shop_id,
            item_id = %request.item_id,
            quantity = request.quantity,
        )
    )]
    pub async fn place_order(&self, request: &NewOrder) -> Result<OrderView, MarketError> {
        let result = match request.validate() {
            Ok(()) => {
                self.settings
                    .retry
                    .run("place_order", move || self.place_once(request))
                    .await
            }
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(order) => {
                info!(
                    order_id = %order.id(),
                    order_number = %order.order_number(),
                    total_amount = %order.total_amount(),
                    "order placed"
                );
                Ok(present(self.store, order).await)
            }
            Err(err) => {
                log_failure("place_order", &err);
                Err(err)
            }
        }
    }

    async fn place_once(&self, request: &NewOrder) -> Result<Order, MarketError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let item = tx
            .subcategory(request.item_id)
            .await?
            .ok_or(MarketError::ProductUnavailable)?;

        let key = InventoryKey::new(request.shop_id, request.item_id);
        let record = reserve_in(&mut tx, key, request.quantity, now).await?;
        let unit_price = record.unit_price();
        item.check_price(unit_price)?;

        let order = insert_numbered(
            &mut tx,
            request,
            unit_price,
            self.settings.delivery_days,
            self.settings.order_number_attempts,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok(order)
    }
}

/// Insert the order under the next free `ORD-<year>-<seq>` number, trying at
/// most `max_attempts` numbers, then append its `null → pending` event.
pub(crate) async fn insert_numbered<U: UnitOfWork>(
    tx: &mut U,
    request: &NewOrder,
    unit_price: Money,
    delivery_days: u32,
    max_attempts: u32,
    now: DateTime<Utc>,
) -> Result<Order, MarketError> {
    let year = now.year();
    let last = tx.last_order_sequence(year).await?;
    let number = OrderNumber::after(year, last).map_err(|_| exhausted(year))?;
    let (mut order, event) = Order::place(request, number, unit_price, delivery_days, now)?;

    for attempt in 1..=max_attempts {
        if tx.insert_order(&order).await? {
            tx.append_status_event(&event).await?;
            return Ok(order);
        }
        let taken = order.order_number();
        debug!(attempt, order_number = %taken, "order number already taken");
        if attempt == max_attempts {
            break;
        }
        let latest = tx.last_order_sequence(year).await?;
        let next = OrderNumber::after(year, latest.max(taken.sequence())).map_err(|_| exhausted(year))?;
        order.renumber(next);
    }
    Err(exhausted(year))
}

fn exhausted(year: i32) -> MarketError {
    error!(year, "order number allocation exhausted");
    MarketError::OrderNumberExhausted { year }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;

    use fairmart_catalog::Subcategory;
    use fairmart_core::{CustomerId, ItemId, OrderId, ShopId};
    use fairmart_inventory::InventoryRecord;
    use fairmart_orders::OrderStatusEvent;

    use crate::error::StoreError;
    use crate::store::ReserveOutcome;

    /// Reports a stale "last sequence" and refuses numbers in `taken`, as a
    /// concurrent writer would.
    #[derive(Default)]
    struct CollidingTx {
        stale_last: u32,
        taken: HashSet<u32>,
        inserted: Vec<Order>,
        events: Vec<OrderStatusEvent>,
    }

    #[async_trait]
    impl UnitOfWork for CollidingTx {
        async fn subcategory(&mut self, _: ItemId) -> Result<Option<Subcategory>, StoreError> {
            unimplemented!()
        }
        async fn lock_inventory_record(&mut self, _: InventoryKey) -> Result<Option<InventoryRecord>, StoreError> {
            unimplemented!()
        }
        async fn insert_inventory_record(&mut self, _: &InventoryRecord) -> Result<bool, StoreError> {
            unimplemented!()
        }
        async fn update_inventory_record(&mut self, _: &InventoryRecord) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn reserve_stock(
            &mut self,
            _: InventoryKey,
            _: u32,
            _: DateTime<Utc>,
        ) -> Result<ReserveOutcome, StoreError> {
            unimplemented!()
        }
        async fn release_stock(&mut self, _: InventoryKey, _: u32, _: DateTime<Utc>) -> Result<bool, StoreError> {
            unimplemented!()
        }
        async fn last_order_sequence(&mut self, _: i32) -> Result<u32, StoreError> {
            Ok(self.stale_last)
        }
        async fn insert_order(&mut self, order: &Order) -> Result<bool, StoreError> {
            if self.taken.contains(&order.order_number().sequence()) {
                return Ok(false);
            }
            self.inserted.push(order.clone());
            Ok(true)
        }
        async fn lock_order(&mut self, _: OrderId) -> Result<Option<Order>, StoreError> {
            unimplemented!()
        }
        async fn update_order_status(&mut self, _: &Order) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn append_status_event(&mut self, event: &OrderStatusEvent) -> Result<(), StoreError> {
            self.events.push(event.clone());
            Ok(())
        }
        async fn commit(self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn test_request() -> NewOrder {
        NewOrder {
            customer_id: CustomerId::new(),
            shop_id: ShopId::new(),
            item_id: ItemId::new(),
            quantity: 2,
            delivery_address: "Road 4".into(),
            delivery_phone: "01811111111".into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn collisions_advance_to_the_next_free_number() {
        let mut tx = CollidingTx {
            stale_last: 4,
            taken: [5, 6, 7].into_iter().collect(),
            ..CollidingTx::default()
        };
        let now = Utc::now();
        let order = insert_numbered(&mut tx, &test_request(), Money::new(30), 3, 5, now)
            .await
            .unwrap();

        assert_eq!(order.order_number().sequence(), 8);
        assert_eq!(order.order_number().to_string(), format!("ORD-{}-000008", now.year()));
        assert_eq!(tx.inserted.len(), 1);
        assert_eq!(tx.events.len(), 1);
        assert_eq!(tx.events[0].order_id, order.id());
    }

    #[tokio::test]
    async fn bounded_attempts_end_in_exhaustion() {
        let mut tx = CollidingTx {
            stale_last: 0,
            taken: (1..=10).collect(),
            ..CollidingTx::default()
        };
        let now = Utc::now();
        let err = insert_numbered(&mut tx, &test_request(), Money::new(30), 3, 3, now)
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::OrderNumberExhausted { year: now.year() });
        assert!(tx.inserted.is_empty());
        assert!(tx.events.is_empty());
    }

    #[tokio::test]
    async fn full_year_is_exhausted_without_inserting() {
        let mut tx = CollidingTx {
            stale_last: OrderNumber::MAX_SEQUENCE,
            ..CollidingTx::default()
        };
        let err = insert_numbered(&mut tx, &test_request(), Money::new(30), 3, 20, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "order_number_exhausted");
        assert!(tx.inserted.is_empty());
    }
}
