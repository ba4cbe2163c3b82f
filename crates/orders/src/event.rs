use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fairmart_core::OrderId;

use crate::status::{ActorRole, OrderStatus};

/// One entry of an order's append-only status trail.
///
/// Creation writes the first entry with `old_status = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusEvent {
    pub order_id: OrderId,
    pub old_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_by: ActorRole,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
