use fairmart_auth::{Principal, PrincipalId, Role};
use fairmart_core::{CustomerId, ShopId};
use fairmart_orders::Actor;

/// Principal context for a request (authenticated identity + role).
///
/// A customer's principal id is their customer id; a shop owner's is the id
/// of the shop they run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    role: Role,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, role: Role) -> Self {
        Self { principal_id, role }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.principal_id, self.role)
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        match self.role {
            Role::Customer => Some(CustomerId::from_uuid(*self.principal_id.as_uuid())),
            _ => None,
        }
    }

    pub fn shop_id(&self) -> Option<ShopId> {
        match self.role {
            Role::ShopOwner => Some(ShopId::from_uuid(*self.principal_id.as_uuid())),
            _ => None,
        }
    }

    /// The order-side actor, if this role takes part in orders at all.
    pub fn actor(&self) -> Option<Actor> {
        match self.role {
            Role::Customer => self.customer_id().map(Actor::Customer),
            Role::ShopOwner => self.shop_id().map(Actor::ShopOwner),
            Role::Wholesaler => None,
        }
    }
}
