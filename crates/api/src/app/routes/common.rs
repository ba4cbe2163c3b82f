use fairmart_auth::Permission;
use fairmart_core::{CustomerId, ShopId};
use fairmart_orders::Actor;

use crate::app::errors;
use crate::context::PrincipalContext;

pub type HandlerResult<T> = Result<T, axum::response::Response>;

pub fn guard(principal: &PrincipalContext, permission: &Permission) -> HandlerResult<()> {
    crate::authz::require(principal, permission).map_err(errors::forbidden)
}

pub fn guard_actor(principal: &PrincipalContext, permission: &Permission) -> HandlerResult<Actor> {
    crate::authz::require_actor(principal, permission).map_err(errors::forbidden)
}

/// The caller's shop; only shop owners have one.
pub fn guard_shop(principal: &PrincipalContext, permission: &Permission) -> HandlerResult<ShopId> {
    guard(principal, permission)?;
    principal
        .shop_id()
        .ok_or_else(|| errors::forbidden(fairmart_auth::AuthzError::Forbidden(permission.as_str().to_string())))
}

pub fn guard_customer(principal: &PrincipalContext, permission: &Permission) -> HandlerResult<CustomerId> {
    guard(principal, permission)?;
    principal
        .customer_id()
        .ok_or_else(|| errors::forbidden(fairmart_auth::AuthzError::Forbidden(permission.as_str().to_string())))
}
