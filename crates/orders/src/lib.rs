//! Orders domain module.
//!
//! Order placement rules, the status lifecycle, the append-only status trail
//! and per-customer statistics. Deterministic logic only (no IO, no HTTP, no
//! storage).

pub mod event;
pub mod number;
pub mod order;
pub mod stats;
pub mod status;

pub use event::OrderStatusEvent;
pub use number::{OrderNumber, OrderNumberError};
pub use order::{NewOrder, Order, OrderParts, DEFAULT_DELIVERY_DAYS};
pub use stats::{OrderStats, StatusCounts};
pub use status::{allowed_transitions, check_transition, Actor, ActorRole, OrderStatus, TransitionError};
