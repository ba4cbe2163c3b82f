//! API-side authorization guard.
//!
//! Permissions are checked at the handler boundary, before any service call,
//! so the services stay auth-agnostic and only see an [`Actor`].

use fairmart_auth::{authorize, AuthzError, Permission};
use fairmart_orders::Actor;

use crate::context::PrincipalContext;

/// Check one permission for the current request's principal.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    authorize(&principal.principal(), permission)
}

/// Check a permission and resolve the order-side actor in one step.
pub fn require_actor(principal: &PrincipalContext, permission: &Permission) -> Result<Actor, AuthzError> {
    require(principal, permission)?;
    principal
        .actor()
        .ok_or_else(|| AuthzError::Forbidden(permission.as_str().to_string()))
}
