//! Catalog reference data.
//!
//! Categories and items (subcategories) with their regulated price bands. The
//! catalog is read-only from the marketplace's point of view; bands are
//! refreshed by an external price feed.

pub mod band;
pub mod item;

pub use band::{PriceBand, PriceBound, PriceViolation};
pub use item::{Category, Subcategory};
