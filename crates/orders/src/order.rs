use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use fairmart_core::error::ensure_present;
use fairmart_core::{CustomerId, DomainError, DomainResult, Entity, ItemId, Money, OrderId, ShopId};

use crate::event::OrderStatusEvent;
use crate::number::OrderNumber;
use crate::status::{check_transition, Actor, ActorRole, OrderStatus, TransitionError};

/// Days added to the placement time for `estimated_delivery` by default.
pub const DEFAULT_DELIVERY_DAYS: u32 = 3;

/// A customer's order request, before stock is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub shop_id: ShopId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        ensure_present("delivery_address", &self.delivery_address)?;
        ensure_present("delivery_phone", &self.delivery_phone)?;
        Ok(())
    }
}

/// Storage representation of an order, used to rebuild the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    pub shop_id: ShopId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_amount: Money,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub cancellation_reason: Option<String>,
    pub estimated_delivery: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A placed order.
///
/// `unit_price` and `total_amount` are fixed at placement. `status` only
/// changes through [`Order::transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    customer_id: CustomerId,
    shop_id: ShopId,
    item_id: ItemId,
    quantity: u32,
    unit_price: Money,
    total_amount: Money,
    delivery_address: String,
    delivery_phone: String,
    notes: Option<String>,
    status: OrderStatus,
    cancellation_reason: Option<String>,
    estimated_delivery: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a `pending` order from a validated request and the price
    /// snapshotted while its stock was reserved.
    ///
    /// Returns the order together with its `null → pending` event.
    pub fn place(
        request: &NewOrder,
        order_number: OrderNumber,
        unit_price: Money,
        delivery_days: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<(Order, OrderStatusEvent)> {
        request.validate()?;
        let total_amount = unit_price.times(request.quantity)?;

        let order = Order {
            id: OrderId::new(),
            order_number,
            customer_id: request.customer_id,
            shop_id: request.shop_id,
            item_id: request.item_id,
            quantity: request.quantity,
            unit_price,
            total_amount,
            delivery_address: request.delivery_address.trim().to_string(),
            delivery_phone: request.delivery_phone.trim().to_string(),
            notes: request.notes.clone(),
            status: OrderStatus::Pending,
            cancellation_reason: None,
            estimated_delivery: now + Duration::days(i64::from(delivery_days)),
            created_at: now,
            updated_at: now,
        };
        let event = OrderStatusEvent {
            order_id: order.id,
            old_status: None,
            new_status: OrderStatus::Pending,
            changed_by: ActorRole::Customer,
            notes: Some("Order placed".to_string()),
            created_at: now,
        };
        Ok((order, event))
    }

    pub fn rehydrate(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            order_number: parts.order_number,
            customer_id: parts.customer_id,
            shop_id: parts.shop_id,
            item_id: parts.item_id,
            quantity: parts.quantity,
            unit_price: parts.unit_price,
            total_amount: parts.total_amount,
            delivery_address: parts.delivery_address,
            delivery_phone: parts.delivery_phone,
            notes: parts.notes,
            status: parts.status,
            cancellation_reason: parts.cancellation_reason,
            estimated_delivery: parts.estimated_delivery,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    /// Swap in another number after a collision. Only meaningful before the
    /// order has been persisted.
    pub fn renumber(&mut self, order_number: OrderNumber) {
        self.order_number = order_number;
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> OrderNumber {
        self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn delivery_address(&self) -> &str {
        &self.delivery_address
    }

    pub fn delivery_phone(&self) -> &str {
        &self.delivery_phone
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn estimated_delivery(&self) -> DateTime<Utc> {
        self.estimated_delivery
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.owns(self.customer_id, self.shop_id)
    }

    /// Apply a status change and produce its audit event.
    ///
    /// Ownership is the caller's concern; this only checks the lifecycle and
    /// role rules. On cancellation `notes` doubles as the reason, falling back
    /// to a per-role default.
    pub fn transition(
        &mut self,
        actor: &Actor,
        to: OrderStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderStatusEvent, TransitionError> {
        let role = actor.role();
        check_transition(role, self.status, to)?;

        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let notes = if to == OrderStatus::Cancelled {
            let reason = notes.unwrap_or_else(|| role.default_cancellation_reason().to_string());
            self.cancellation_reason = Some(reason.clone());
            Some(reason)
        } else {
            notes
        };

        let from = self.status;
        self.status = to;
        self.updated_at = now;

        Ok(OrderStatusEvent {
            order_id: self.id,
            old_status: Some(from),
            new_status: to,
            changed_by: role,
            notes,
            created_at: now,
        })
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request(quantity: u32) -> NewOrder {
        NewOrder {
            customer_id: CustomerId::new(),
            shop_id: ShopId::new(),
            item_id: ItemId::new(),
            quantity,
            delivery_address: " House 7, Road 3 ".into(),
            delivery_phone: "01700000000".into(),
            notes: None,
        }
    }

    fn test_number() -> OrderNumber {
        OrderNumber::new(2026, 1).unwrap()
    }

    fn placed(quantity: u32) -> Order {
        Order::place(&test_request(quantity), test_number(), Money::new(45), 3, Utc::now())
            .unwrap()
            .0
    }

    #[test]
    fn place_snapshots_price_and_total() {
        let now = Utc::now();
        let (order, event) =
            Order::place(&test_request(7), test_number(), Money::new(45), 3, now).unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), Money::new(315));
        assert_eq!(order.delivery_address(), "House 7, Road 3");
        assert_eq!(order.estimated_delivery(), now + Duration::days(3));
        assert_eq!(event.old_status, None);
        assert_eq!(event.new_status, OrderStatus::Pending);
        assert_eq!(event.changed_by, ActorRole::Customer);
    }

    #[test]
    fn place_rejects_zero_quantity_and_blank_fields() {
        assert!(Order::place(&test_request(0), test_number(), Money::new(1), 3, Utc::now()).is_err());

        let mut req = test_request(1);
        req.delivery_phone = String::new();
        let err = Order::place(&req, test_number(), Money::new(1), 3, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("delivery_phone is required"));
    }

    #[test]
    fn shop_owner_walks_the_forward_chain() {
        let mut order = placed(1);
        let owner = Actor::ShopOwner(order.shop_id());
        for to in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            let from = order.status();
            let event = order.transition(&owner, to, None, Utc::now()).unwrap();
            assert_eq!(event.old_status, Some(from));
            assert_eq!(event.new_status, to);
        }
        assert!(order.status().is_terminal());
    }

    #[test]
    fn cancellation_records_default_reason() {
        let mut order = placed(2);
        let customer = Actor::Customer(order.customer_id());
        let event = order
            .transition(&customer, OrderStatus::Cancelled, Some("  ".into()), Utc::now())
            .unwrap();
        assert_eq!(order.cancellation_reason(), Some("Cancelled by customer"));
        assert_eq!(event.notes.as_deref(), Some("Cancelled by customer"));
    }

    #[test]
    fn second_cancellation_is_rejected_and_leaves_order_unchanged() {
        let mut order = placed(2);
        let customer = Actor::Customer(order.customer_id());
        order
            .transition(&customer, OrderStatus::Cancelled, Some("changed my mind".into()), Utc::now())
            .unwrap();
        let before = order.clone();

        let err = order
            .transition(&customer, OrderStatus::Cancelled, None, Utc::now())
            .unwrap_err();
        assert_eq!(err, TransitionError::Terminal { from: OrderStatus::Cancelled });
        assert_eq!(order, before);
    }

    #[test]
    fn visibility_follows_ownership() {
        let order = placed(1);
        assert!(order.is_visible_to(&Actor::Customer(order.customer_id())));
        assert!(!order.is_visible_to(&Actor::ShopOwner(ShopId::new())));
    }
}
