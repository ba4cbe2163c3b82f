//! Shared domain primitives for the marketplace.
//!
//! Pure domain code only: identifiers, money, and the domain error model.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, CustomerId, ItemId, OrderId, ShopId};
pub use money::Money;
