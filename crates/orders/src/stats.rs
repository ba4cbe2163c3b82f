//! Per-customer order statistics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use fairmart_core::Money;

use crate::order::Order;
use crate::status::OrderStatus;

/// Window used for the "recent" counters.
pub const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub confirmed: u64,
    pub preparing: u64,
    pub ready: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn increment(&mut self, status: OrderStatus) {
        let slot = match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Confirmed => &mut self.confirmed,
            OrderStatus::Preparing => &mut self.preparing,
            OrderStatus::Ready => &mut self.ready,
            OrderStatus::Delivered => &mut self.delivered,
            OrderStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: u64,
    pub by_status: StatusCounts,
    /// Sum over every order that was not cancelled.
    pub total_spent: Money,
    /// Integer mean over delivered orders; zero when there are none.
    pub average_order_value: Money,
    pub recent_orders: u64,
    pub recent_delivered: u64,
}

impl OrderStats {
    pub fn compute<'a>(orders: impl IntoIterator<Item = &'a Order>, now: DateTime<Utc>) -> Self {
        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let mut stats = OrderStats::default();
        let mut spent: u128 = 0;
        let mut delivered_total: u128 = 0;

        for order in orders {
            stats.total_orders += 1;
            stats.by_status.increment(order.status());

            let amount = u128::from(order.total_amount().amount());
            if order.status() != OrderStatus::Cancelled {
                spent += amount;
            }
            if order.status() == OrderStatus::Delivered {
                delivered_total += amount;
            }
            if order.created_at() >= cutoff {
                stats.recent_orders += 1;
                if order.status() == OrderStatus::Delivered {
                    stats.recent_delivered += 1;
                }
            }
        }

        stats.total_spent = Money::new(u64::try_from(spent).unwrap_or(u64::MAX));
        if stats.by_status.delivered > 0 {
            let mean = delivered_total / u128::from(stats.by_status.delivered);
            stats.average_order_value = Money::new(u64::try_from(mean).unwrap_or(u64::MAX));
        }
        stats
    }
}
