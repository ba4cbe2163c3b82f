//! Status machine: the only writer of order status and status events.

use chrono::Utc;
use tracing::{info, instrument};

use fairmart_core::OrderId;
use fairmart_orders::{Actor, Order, OrderStatus};

use crate::error::MarketError;
use crate::retry::RetryPolicy;
use crate::services::reconciler::InventoryReconciler;
use crate::services::{log_failure, present};
use crate::store::{OrderView, Store, UnitOfWork};

pub struct StatusMachine<'a, S: Store> {
    store: &'a S,
    retry: &'a RetryPolicy,
}

impl<'a, S: Store> StatusMachine<'a, S> {
    pub fn new(store: &'a S, retry: &'a RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Move an order to `to` on behalf of `actor`.
    ///
    /// The status update, its event and any stock release commit together.
    /// Orders the actor does not own are reported as [`MarketError::OrderNotFound`].
    #[instrument(skip(self, actor, notes), fields(role = %actor.role(), to = %to))]
    pub async fn apply_transition(
        &self,
        order_id: OrderId,
        actor: Actor,
        to: OrderStatus,
        notes: Option<String>,
    ) -> Result<OrderView, MarketError> {
        let result = self
            .retry
            .run("apply_transition", move || {
                self.transition_once(order_id, actor, to, notes.clone())
            })
            .await;
        match result {
            Ok(order) => {
                info!(
                    order_number = %order.order_number(),
                    status = %order.status(),
                    "order status changed"
                );
                Ok(present(self.store, order).await)
            }
            Err(err) => {
                log_failure("apply_transition", &err);
                Err(err)
            }
        }
    }

    /// Cancel with an optional reason; the role's default reason applies
    /// otherwise.
    pub async fn cancel(
        &self,
        order_id: OrderId,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<OrderView, MarketError> {
        self.apply_transition(order_id, actor, OrderStatus::Cancelled, reason)
            .await
    }

    async fn transition_once(
        &self,
        order_id: OrderId,
        actor: Actor,
        to: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, MarketError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order(order_id)
            .await?
            .filter(|o| o.is_visible_to(&actor))
            .ok_or(MarketError::OrderNotFound)?;

        let event = order.transition(&actor, to, notes, now)?;
        tx.update_order_status(&order).await?;
        tx.append_status_event(&event).await?;
        InventoryReconciler::on_transition(&mut tx, &order, &event).await?;

        tx.commit().await?;
        Ok(order)
    }
}
