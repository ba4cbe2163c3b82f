//! Reference data loaded at startup: catalog, customers and shops.
//!
//! Band prices in the seed file are paisa, like every stored amount.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fairmart_catalog::{Category, Subcategory};

use crate::error::StoreError;
use crate::store::{CustomerProfile, ShopProfile, Store};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("item '{item}' references unknown category")]
    UnknownCategory { item: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSeed {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub items: Vec<Subcategory>,
    #[serde(default)]
    pub customers: Vec<CustomerProfile>,
    #[serde(default)]
    pub shops: Vec<ShopProfile>,
}

impl MarketSeed {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Write every entry through the store's upsert operations.
    pub async fn apply<S: Store>(&self, store: &S) -> Result<(), SeedError> {
        for item in &self.items {
            let category = self
                .categories
                .iter()
                .find(|c| c.id == item.category_id)
                .ok_or_else(|| SeedError::UnknownCategory {
                    item: item.name.clone(),
                })?;
            store.put_subcategory(category, item).await?;
        }
        for customer in &self.customers {
            store.put_customer(customer).await?;
        }
        for shop in &self.shops {
            store.put_shop(shop).await?;
        }
        tracing::info!(
            items = self.items.len(),
            customers = self.customers.len(),
            shops = self.shops.len(),
            "seed applied"
        );
        Ok(())
    }
}
