use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fairmart_core::{CustomerId, DomainError, ShopId};

/// Order status lifecycle.
///
/// `pending → confirmed → preparing → ready → delivered`, with `cancelled`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Next step on the forward chain, if any.
    pub fn next_forward(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Every status reachable in one step, ignoring who is asking.
    pub fn reachable(self) -> Vec<OrderStatus> {
        if self.is_terminal() {
            return Vec::new();
        }
        let mut out: Vec<OrderStatus> = self.next_forward().into_iter().collect();
        out.push(OrderStatus::Cancelled);
        out
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown order status '{s}'")))
    }
}

/// Role recorded as `changed_by` on status events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    ShopOwner,
    System,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::ShopOwner => "shop_owner",
            ActorRole::System => "system",
        }
    }

    pub fn default_cancellation_reason(self) -> &'static str {
        match self {
            ActorRole::Customer => "Cancelled by customer",
            ActorRole::ShopOwner => "Cancelled by shop owner",
            ActorRole::System => "Cancelled by system",
        }
    }
}

impl FromStr for ActorRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(ActorRole::Customer),
            "shop_owner" => Ok(ActorRole::ShopOwner),
            "system" => Ok(ActorRole::System),
            other => Err(DomainError::validation(format!("unknown actor role '{other}'"))),
        }
    }
}

impl core::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whoever is requesting a status change, with the identity used for the
/// ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer(CustomerId),
    ShopOwner(ShopId),
    System,
}

impl Actor {
    pub fn role(&self) -> ActorRole {
        match self {
            Actor::Customer(_) => ActorRole::Customer,
            Actor::ShopOwner(_) => ActorRole::ShopOwner,
            Actor::System => ActorRole::System,
        }
    }

    /// Whether this actor may see (and act on) an order with these owners.
    pub fn owns(&self, customer_id: CustomerId, shop_id: ShopId) -> bool {
        match self {
            Actor::Customer(id) => *id == customer_id,
            Actor::ShopOwner(id) => *id == shop_id,
            Actor::System => true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("order is already {from}; no further transitions are allowed")]
    Terminal { from: OrderStatus },

    #[error("cannot move order from {from} to {to}")]
    NotReachable {
        from: OrderStatus,
        to: OrderStatus,
        allowed: Vec<OrderStatus>,
    },

    #[error("{role} may not move an order to {to}")]
    NotPermitted {
        role: ActorRole,
        to: OrderStatus,
        allowed: Vec<OrderStatus>,
    },
}

impl TransitionError {
    /// Next states the same actor could legally request instead.
    pub fn allowed(&self) -> &[OrderStatus] {
        match self {
            TransitionError::Terminal { .. } => &[],
            TransitionError::NotReachable { allowed, .. } => allowed,
            TransitionError::NotPermitted { allowed, .. } => allowed,
        }
    }
}

/// Statuses `role` may move an order to from `from`.
pub fn allowed_transitions(role: ActorRole, from: OrderStatus) -> Vec<OrderStatus> {
    match role {
        ActorRole::Customer if !from.is_terminal() => vec![OrderStatus::Cancelled],
        ActorRole::Customer => Vec::new(),
        ActorRole::ShopOwner | ActorRole::System => from.reachable(),
    }
}

pub fn check_transition(
    role: ActorRole,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), TransitionError> {
    if from.is_terminal() {
        return Err(TransitionError::Terminal { from });
    }
    if !from.reachable().contains(&to) {
        return Err(TransitionError::NotReachable {
            from,
            to,
            allowed: allowed_transitions(role, from),
        });
    }
    let allowed = allowed_transitions(role, from);
    if !allowed.contains(&to) {
        return Err(TransitionError::NotPermitted { role, to, allowed });
    }
    Ok(())
}
