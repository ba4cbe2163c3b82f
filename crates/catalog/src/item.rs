use serde::{Deserialize, Serialize};

use fairmart_core::{CategoryId, Entity, ItemId, Money};

use crate::band::{PriceBand, PriceViolation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A sellable catalog item.
///
/// Shops stock subcategories, not categories. The unit is informational
/// ("kg", "litre", "dozen").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: ItemId,
    pub category_id: CategoryId,
    pub name: String,
    pub unit: String,
    #[serde(flatten)]
    pub band: PriceBand,
}

impl Subcategory {
    pub fn check_price(&self, price: Money) -> Result<(), PriceViolation> {
        self.band.check(price)
    }
}

impl Entity for Subcategory {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
