//! Puts reserved stock back when an order is cancelled.

use tracing::info;

use fairmart_inventory::InventoryKey;
use fairmart_orders::{Order, OrderStatus, OrderStatusEvent};

use crate::error::MarketError;
use crate::services::ledger::release_in;
use crate::store::UnitOfWork;

pub struct InventoryReconciler;

impl InventoryReconciler {
    /// React to a transition applied in `tx`. Only cancellation has an
    /// effect.
    ///
    /// Runs at most once per order: `cancelled` is terminal, so the status
    /// machine never produces a second cancellation event for it.
    pub async fn on_transition<U: UnitOfWork>(
        tx: &mut U,
        order: &Order,
        event: &OrderStatusEvent,
    ) -> Result<(), MarketError> {
        if event.new_status != OrderStatus::Cancelled {
            return Ok(());
        }
        Self::on_cancellation(tx, order, event).await
    }

    pub async fn on_cancellation<U: UnitOfWork>(
        tx: &mut U,
        order: &Order,
        event: &OrderStatusEvent,
    ) -> Result<(), MarketError> {
        let key = InventoryKey::new(order.shop_id(), order.item_id());
        release_in(tx, key, order.quantity(), event.created_at).await?;
        info!(
            order_id = %order.id(),
            shop_id = %key.shop_id,
            item_id = %key.item_id,
            quantity = order.quantity(),
            "reserved stock released"
        );
        Ok(())
    }
}
