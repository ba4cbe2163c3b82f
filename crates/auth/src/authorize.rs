use thiserror::Error;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

const CUSTOMER: &[Permission] = &[
    Permission::CATALOG_READ,
    Permission::ORDERS_PLACE,
    Permission::ORDERS_READ,
    Permission::ORDERS_CANCEL,
];

const SHOP_OWNER: &[Permission] = &[
    Permission::CATALOG_READ,
    Permission::INVENTORY_READ,
    Permission::INVENTORY_WRITE,
    Permission::ORDERS_READ,
    Permission::ORDERS_CANCEL,
    Permission::ORDERS_ADVANCE,
];

const WHOLESALER: &[Permission] = &[Permission::CATALOG_READ];

/// Static role → permission mapping.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Customer => CUSTOMER,
        Role::ShopOwner => SHOP_OWNER,
        Role::Wholesaler => WHOLESALER,
    }
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if role_permissions(principal.role).contains(required) {
        Ok(())
    } else {
        tracing::debug!(
            principal_id = %principal.principal_id,
            role = %principal.role,
            permission = %required,
            "authorization denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
