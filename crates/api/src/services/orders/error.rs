//! Order lifecycle error types.

use thiserror::Error;

use mercato_core::{MoneyError, OrderId, OrderStatusError, OrderValidationError, StoreId};

use crate::db::RepositoryError;

/// Errors that can occur during order lifecycle operations.
///
/// Every variant is returned only after the operation's transaction has been
/// rolled back.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request is malformed or references data outside the caller's store.
    #[error("invalid order request: {0}")]
    Validation(String),

    /// The order does not exist or belongs to another store.
    ///
    /// The two cases are deliberately indistinguishable.
    #[error("order {order_id} not found for store {store_id}")]
    NotAuthorizedOrNotFound {
        /// Order the caller asked for.
        order_id: OrderId,
        /// Store the caller acts for.
        store_id: StoreId,
    },

    /// Stored data contradicts an invariant the engine relies on.
    #[error("integrity violation on order {order_id}: {detail}")]
    Integrity {
        /// Order being processed.
        order_id: OrderId,
        /// What was found.
        detail: String,
    },

    /// The database failed.
    #[error("storage error: {source}")]
    Storage {
        /// Underlying repository error.
        source: RepositoryError,
        /// Whether retrying the whole operation may succeed.
        retryable: bool,
    },
}

impl OrderError {
    /// Short machine-readable name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotAuthorizedOrNotFound { .. } => "not_authorized_or_not_found",
            Self::Integrity { .. } => "integrity_error",
            Self::Storage { .. } => "storage_error",
        }
    }

    /// Whether the caller may retry the operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { retryable: true, .. })
    }

    pub(crate) fn integrity(order_id: OrderId, detail: impl std::fmt::Display) -> Self {
        Self::Integrity {
            order_id,
            detail: detail.to_string(),
        }
    }
}

impl From<RepositoryError> for OrderError {
    fn from(source: RepositoryError) -> Self {
        Self::Storage {
            retryable: source.is_transient(),
            source,
        }
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::from(RepositoryError::from(err))
    }
}

impl From<OrderValidationError> for OrderError {
    fn from(err: OrderValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<OrderStatusError> for OrderError {
    fn from(err: OrderStatusError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<MoneyError> for OrderError {
    fn from(err: MoneyError) -> Self {
        Self::Validation(format!("total_amount: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_carries_transience() {
        let err = OrderError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "storage_error");

        let err = OrderError::from(RepositoryError::Conflict("x".to_string()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_errors_convert() {
        let err = OrderError::from(OrderValidationError::NoItems);
        assert!(matches!(&err, OrderError::Validation(msg) if msg.contains("at least one item")));
        assert_eq!(err.kind(), "validation_error");
        assert!(!err.is_retryable());

        let err = OrderError::from(MoneyError::Negative);
        assert!(matches!(&err, OrderError::Validation(msg) if msg.starts_with("total_amount")));
    }

    #[test]
    fn test_not_found_message_names_order_and_store() {
        let err = OrderError::NotAuthorizedOrNotFound {
            order_id: OrderId::new(7),
            store_id: StoreId::new(2),
        };
        assert_eq!(err.to_string(), "order 7 not found for store 2");
        assert_eq!(err.kind(), "not_authorized_or_not_found");
    }
}
