use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role carried in the token.
///
/// A shop owner account owns exactly one shop; its principal id doubles as the
/// shop id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    ShopOwner,
    Wholesaler,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::ShopOwner => "shop_owner",
            Role::Wholesaler => "wholesaler",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "shop_owner" => Ok(Role::ShopOwner),
            "wholesaler" => Ok(Role::Wholesaler),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
