//! Error taxonomy surfaced by marketplace services.

use thiserror::Error;

use fairmart_catalog::{PriceBound, PriceViolation};
use fairmart_core::{DomainError, Money};
use fairmart_inventory::StockError;
use fairmart_orders::{OrderStatus, TransitionError};

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Contention, lock timeout, deadlock or a dropped connection. The unit of
    /// work was rolled back and may be retried.
    #[error("transient storage failure in {operation}: {message}")]
    Transient {
        operation: &'static str,
        message: String,
    },

    #[error("storage failure in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// A persisted row could not be mapped back into the domain.
    #[error("corrupt row in {operation}: {message}")]
    Corrupt {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn transient(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transient {
            operation,
            message: message.into(),
        }
    }

    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    pub fn corrupt(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            operation,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient { .. })
    }
}

/// Every failure a marketplace operation can report to its caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    PriceOutOfRange(PriceViolation),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { available: u32, requested: u32 },

    #[error("product is not available from this shop")]
    ProductUnavailable,

    #[error("order not found")]
    OrderNotFound,

    #[error("{0}")]
    InvalidTransition(TransitionError),

    #[error("no order numbers left for {year}")]
    OrderNumberExhausted { year: i32 },

    #[error("temporary failure, retry the request: {0}")]
    TransientFailure(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl MarketError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::InvalidRequest(_) => "invalid_request",
            MarketError::PriceOutOfRange(_) => "price_out_of_range",
            MarketError::InsufficientStock { .. } => "insufficient_stock",
            MarketError::ProductUnavailable => "product_unavailable",
            MarketError::OrderNotFound => "order_not_found",
            MarketError::InvalidTransition(_) => "invalid_transition",
            MarketError::OrderNumberExhausted { .. } => "order_number_exhausted",
            MarketError::TransientFailure(_) => "transient_failure",
            MarketError::Storage(_) => "storage_failure",
        }
    }

    /// Only storage contention is retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketError::TransientFailure(_))
    }

    pub fn allowed_statuses(&self) -> Option<&[OrderStatus]> {
        match self {
            MarketError::InvalidTransition(err) => Some(err.allowed()),
            _ => None,
        }
    }

    pub fn violated_bound(&self) -> Option<(PriceBound, Money)> {
        match self {
            MarketError::PriceOutOfRange(v) => Some((v.bound, v.limit)),
            _ => None,
        }
    }
}

impl From<DomainError> for MarketError {
    fn from(err: DomainError) -> Self {
        MarketError::InvalidRequest(err.to_string())
    }
}

impl From<PriceViolation> for MarketError {
    fn from(err: PriceViolation) -> Self {
        MarketError::PriceOutOfRange(err)
    }
}

impl From<TransitionError> for MarketError {
    fn from(err: TransitionError) -> Self {
        MarketError::InvalidTransition(err)
    }
}

impl From<StockError> for MarketError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient {
                available,
                requested,
            } => MarketError::InsufficientStock {
                available,
                requested,
            },
            StockError::Inactive => MarketError::ProductUnavailable,
            StockError::Price(v) => MarketError::PriceOutOfRange(v),
            StockError::Invalid(e) => e.into(),
        }
    }
}

impl From<StoreError> for MarketError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            MarketError::TransientFailure(err.to_string())
        } else {
            MarketError::Storage(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_store_errors_are_retryable() {
        let transient: MarketError = StoreError::transient("reserve_stock", "deadlock").into();
        assert!(transient.is_retryable());
        assert_eq!(transient.code(), "transient_failure");

        let corrupt: MarketError = StoreError::corrupt("order_row", "bad status").into();
        assert!(!corrupt.is_retryable());
        assert_eq!(corrupt.code(), "storage_failure");
    }

    #[test]
    fn stock_errors_map_onto_the_taxonomy() {
        let err: MarketError = StockError::Insufficient {
            available: 3,
            requested: 5,
        }
        .into();
        assert_eq!(
            err,
            MarketError::InsufficientStock {
                available: 3,
                requested: 5
            }
        );
        assert_eq!(MarketError::from(StockError::Inactive), MarketError::ProductUnavailable);
    }

    #[test]
    fn transition_errors_expose_allowed_states() {
        let err: MarketError = TransitionError::Terminal {
            from: OrderStatus::Cancelled,
        }
        .into();
        assert_eq!(err.code(), "invalid_transition");
        assert_eq!(err.allowed_statuses(), Some(&[][..]));
    }
}
