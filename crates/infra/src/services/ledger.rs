//! Inventory ledger: the only writer of shop stock counters.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use fairmart_inventory::{
    InventoryAdjustment, InventoryKey, InventoryRecord, StockMode, StockUpsert,
};

use crate::error::{MarketError, StoreError};
use crate::retry::RetryPolicy;
use crate::services::log_failure;
use crate::store::{ReserveOutcome, Store, UnitOfWork};

pub struct InventoryLedger<'a, S: Store> {
    store: &'a S,
    retry: &'a RetryPolicy,
}

impl<'a, S: Store> InventoryLedger<'a, S> {
    pub fn new(store: &'a S, retry: &'a RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Create the record for `key`, or merge into the existing one.
    ///
    /// The price is checked against the item's band before anything is
    /// written. A repeat addition overwrites price and (when supplied)
    /// threshold; quantity follows `upsert.mode`.
    #[instrument(
        skip(self, upsert),
        fields(shop_id = %key.shop_id, item_id = %key.item_id, mode = ?upsert.mode)
    )]
    pub async fn upsert_stock(
        &self,
        key: InventoryKey,
        upsert: &StockUpsert,
    ) -> Result<InventoryRecord, MarketError> {
        if upsert.mode == StockMode::Replace {
            warn!(quantity = upsert.quantity, "stock quantity replaced instead of merged");
        }
        let result = self
            .retry
            .run("upsert_stock", move || self.upsert_once(key, upsert))
            .await;
        match &result {
            Ok(record) => info!(
                quantity = record.quantity(),
                unit_price = %record.unit_price(),
                "stock upserted"
            ),
            Err(err) => log_failure("upsert_stock", err),
        }
        result
    }

    async fn upsert_once(
        &self,
        key: InventoryKey,
        upsert: &StockUpsert,
    ) -> Result<InventoryRecord, MarketError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let item = tx
            .subcategory(key.item_id)
            .await?
            .ok_or_else(|| MarketError::invalid(format!("unknown item {}", key.item_id)))?;
        upsert.validate(&item)?;

        let record = match tx.lock_inventory_record(key).await? {
            Some(mut existing) => {
                existing.apply_upsert(upsert, now)?;
                tx.update_inventory_record(&existing).await?;
                existing
            }
            None => {
                let record = InventoryRecord::create(key, upsert, now);
                if !tx.insert_inventory_record(&record).await? {
                    // Lost a race on the first addition; the replay takes the merge path.
                    return Err(StoreError::transient("upsert_stock", "record created concurrently").into());
                }
                record
            }
        };
        tx.commit().await?;
        Ok(record)
    }

    /// Partial update of an existing record, including soft deactivation.
    #[instrument(skip(self, adjustment), fields(shop_id = %key.shop_id, item_id = %key.item_id))]
    pub async fn adjust(
        &self,
        key: InventoryKey,
        adjustment: &InventoryAdjustment,
    ) -> Result<InventoryRecord, MarketError> {
        let result = self
            .retry
            .run("adjust_stock", move || async move {
                let now = Utc::now();
                let mut tx = self.store.begin().await?;
                let item = tx
                    .subcategory(key.item_id)
                    .await?
                    .ok_or(MarketError::ProductUnavailable)?;
                adjustment.validate(&item)?;
                let mut record = tx
                    .lock_inventory_record(key)
                    .await?
                    .ok_or(MarketError::ProductUnavailable)?;
                record.apply_adjustment(adjustment, now);
                tx.update_inventory_record(&record).await?;
                tx.commit().await?;
                Ok(record)
            })
            .await;
        match &result {
            Ok(record) => info!(
                quantity = record.quantity(),
                is_active = record.is_active(),
                "inventory record adjusted"
            ),
            Err(err) => log_failure("adjust_stock", err),
        }
        result
    }

    /// Standalone reservation in its own unit of work.
    pub async fn reserve(&self, key: InventoryKey, quantity: u32) -> Result<InventoryRecord, MarketError> {
        self.retry
            .run("reserve_stock", move || async move {
                let mut tx = self.store.begin().await?;
                let record = reserve_in(&mut tx, key, quantity, Utc::now()).await?;
                tx.commit().await?;
                Ok(record)
            })
            .await
    }

    /// Standalone release in its own unit of work. Callers own idempotency.
    pub async fn release(&self, key: InventoryKey, quantity: u32) -> Result<(), MarketError> {
        self.retry
            .run("release_stock", move || async move {
                let mut tx = self.store.begin().await?;
                release_in(&mut tx, key, quantity, Utc::now()).await?;
                tx.commit().await?;
                Ok(())
            })
            .await
    }

    pub fn is_low_stock(record: &InventoryRecord) -> bool {
        fairmart_inventory::is_low_stock(record)
    }
}

/// Check-and-decrement inside the caller's unit of work.
pub(crate) async fn reserve_in<U: UnitOfWork>(
    tx: &mut U,
    key: InventoryKey,
    quantity: u32,
    now: DateTime<Utc>,
) -> Result<InventoryRecord, MarketError> {
    if quantity == 0 {
        return Err(MarketError::invalid("quantity must be positive"));
    }
    match tx.reserve_stock(key, quantity, now).await? {
        ReserveOutcome::Reserved(record) => Ok(record),
        ReserveOutcome::Insufficient { available } => Err(MarketError::InsufficientStock {
            available,
            requested: quantity,
        }),
        ReserveOutcome::Unavailable => Err(MarketError::ProductUnavailable),
    }
}

/// Increment inside the caller's unit of work. A missing record is a storage
/// fault: stock can only be released for a pair that was reserved from.
pub(crate) async fn release_in<U: UnitOfWork>(
    tx: &mut U,
    key: InventoryKey,
    quantity: u32,
    now: DateTime<Utc>,
) -> Result<(), MarketError> {
    if tx.release_stock(key, quantity, now).await? {
        Ok(())
    } else {
        Err(MarketError::Storage(format!(
            "no inventory record for shop {} item {}",
            key.shop_id, key.item_id
        )))
    }
}
