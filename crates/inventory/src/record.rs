use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fairmart_catalog::{PriceViolation, Subcategory};
use fairmart_core::{DomainError, Entity, ItemId, Money, ShopId};

/// Threshold applied when a shop adds an item without naming one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

/// Unique key of an inventory record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryKey {
    pub shop_id: ShopId,
    pub item_id: ItemId,
}

impl InventoryKey {
    pub fn new(shop_id: ShopId, item_id: ItemId) -> Self {
        Self { shop_id, item_id }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient { available: u32, requested: u32 },

    #[error("inventory record is inactive")]
    Inactive,

    #[error(transparent)]
    Price(#[from] PriceViolation),

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// How a repeat stock addition treats the existing quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockMode {
    /// Add the submitted quantity to what is already on hand.
    #[default]
    Add,
    /// Overwrite the quantity on hand with the submitted amount.
    Replace,
}

/// A shop owner's "add stock" request for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpsert {
    pub quantity: u32,
    pub unit_price: Money,
    pub low_stock_threshold: Option<u32>,
    #[serde(default)]
    pub mode: StockMode,
}

impl StockUpsert {
    /// Validate the request against the catalog item it targets.
    pub fn validate(&self, item: &Subcategory) -> Result<(), StockError> {
        if self.unit_price.is_zero() {
            return Err(DomainError::validation("unit_price must be positive").into());
        }
        item.check_price(self.unit_price)?;
        Ok(())
    }
}

/// Partial update of an existing record. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub quantity: Option<u32>,
    pub unit_price: Option<Money>,
    pub low_stock_threshold: Option<u32>,
    pub is_active: Option<bool>,
}

impl InventoryAdjustment {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.unit_price.is_none()
            && self.low_stock_threshold.is_none()
            && self.is_active.is_none()
    }

    pub fn validate(&self, item: &Subcategory) -> Result<(), StockError> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update").into());
        }
        if let Some(price) = self.unit_price {
            if price.is_zero() {
                return Err(DomainError::validation("unit_price must be positive").into());
            }
            item.check_price(price)?;
        }
        Ok(())
    }
}

/// Stock held by one shop for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    key: InventoryKey,
    quantity: u32,
    unit_price: Money,
    low_stock_threshold: u32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// First stock addition for a pair. The mode is irrelevant here.
    pub fn create(key: InventoryKey, upsert: &StockUpsert, now: DateTime<Utc>) -> Self {
        Self {
            key,
            quantity: upsert.quantity,
            unit_price: upsert.unit_price,
            low_stock_threshold: upsert
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstruct a record from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn rehydrate(
        key: InventoryKey,
        quantity: u32,
        unit_price: Money,
        low_stock_threshold: u32,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            quantity,
            unit_price,
            low_stock_threshold,
            is_active,
            created_at,
            updated_at,
        }
    }

    pub fn key(&self) -> InventoryKey {
        self.key
    }

    pub fn shop_id(&self) -> ShopId {
        self.key.shop_id
    }

    pub fn item_id(&self) -> ItemId {
        self.key.item_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    /// Quantity relative to the threshold; lower is more urgent.
    pub fn stock_ratio(&self) -> f64 {
        f64::from(self.quantity) / f64::from(self.low_stock_threshold.max(1))
    }

    /// Merge a repeat stock addition into this record.
    ///
    /// Price is overwritten, threshold only when supplied. A deactivated
    /// record is re-listed.
    pub fn apply_upsert(&mut self, upsert: &StockUpsert, now: DateTime<Utc>) -> Result<(), StockError> {
        self.quantity = match upsert.mode {
            StockMode::Add => self
                .quantity
                .checked_add(upsert.quantity)
                .ok_or_else(|| DomainError::validation("quantity overflows"))?,
            StockMode::Replace => upsert.quantity,
        };
        self.unit_price = upsert.unit_price;
        if let Some(threshold) = upsert.low_stock_threshold {
            self.low_stock_threshold = threshold;
        }
        self.is_active = true;
        self.updated_at = now;
        Ok(())
    }

    pub fn apply_adjustment(&mut self, adjustment: &InventoryAdjustment, now: DateTime<Utc>) {
        if let Some(quantity) = adjustment.quantity {
            self.quantity = quantity;
        }
        if let Some(price) = adjustment.unit_price {
            self.unit_price = price;
        }
        if let Some(threshold) = adjustment.low_stock_threshold {
            self.low_stock_threshold = threshold;
        }
        if let Some(active) = adjustment.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
    }

    /// Check-and-decrement. Leaves the record untouched on failure.
    pub fn reserve(&mut self, requested: u32, now: DateTime<Utc>) -> Result<(), StockError> {
        if !self.is_active {
            return Err(StockError::Inactive);
        }
        if requested == 0 {
            return Err(DomainError::validation("quantity must be positive").into());
        }
        if requested > self.quantity {
            return Err(StockError::Insufficient {
                available: self.quantity,
                requested,
            });
        }
        self.quantity -= requested;
        self.updated_at = now;
        Ok(())
    }

    /// Return previously reserved stock. Works on inactive records too.
    pub fn release(&mut self, quantity: u32, now: DateTime<Utc>) -> Result<(), StockError> {
        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invariant("released quantity overflows"))?;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for InventoryRecord {
    type Id = InventoryKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

pub fn is_low_stock(record: &InventoryRecord) -> bool {
    record.is_low_stock()
}
