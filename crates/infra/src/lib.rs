//! Infrastructure layer: configuration, storage, retry and the marketplace
//! services that tie the domain crates to a store.

pub mod config;
pub mod error;
pub mod retry;
pub mod services;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use error::{MarketError, StoreError};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use services::{
    InventoryLedger, InventoryReconciler, Marketplace, OrderDetail, OrderManager, ServiceSettings,
    StatusMachine,
};
