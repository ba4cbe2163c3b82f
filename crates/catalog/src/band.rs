use serde::{Deserialize, Serialize};
use thiserror::Error;

use fairmart_core::Money;

/// Government price band for an item.
///
/// Either bound may be absent, meaning that side is unbounded. Both bounds are
/// inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceBand {
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
}

/// Which side of the band a price fell outside of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBound {
    Min,
    Max,
}

impl PriceBound {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceBound::Min => "min",
            PriceBound::Max => "max",
        }
    }
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
#[error("price {price} violates {} bound {limit}", .bound.as_str())]
pub struct PriceViolation {
    pub price: Money,
    pub bound: PriceBound,
    pub limit: Money,
}

impl PriceBand {
    pub fn new(min_price: Option<Money>, max_price: Option<Money>) -> Self {
        Self {
            min_price,
            max_price,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn check(&self, price: Money) -> Result<(), PriceViolation> {
        if let Some(limit) = self.min_price {
            if price < limit {
                return Err(PriceViolation {
                    price,
                    bound: PriceBound::Min,
                    limit,
                });
            }
        }
        if let Some(limit) = self.max_price {
            if price > limit {
                return Err(PriceViolation {
                    price,
                    bound: PriceBound::Max,
                    limit,
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, price: Money) -> bool {
        self.check(price).is_ok()
    }
}
