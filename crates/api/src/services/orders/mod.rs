//! Order lifecycle engine.
//!
//! Owns the two mutating operations on orders. Each runs in exactly one
//! transaction taken from the pool; any early return drops the transaction,
//! which rolls it back.
//!
//! Sales are recorded once per order: when it is placed as `Delivered`, or on
//! its first transition into `Delivered`. The previous status is read by the
//! same locked statement that writes the new one, so concurrent deliveries of
//! one order serialize and at most one of them records sales. An order that is
//! reopened and delivered again finds its ledger complete and records nothing.

mod error;

pub use error::OrderError;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use mercato_core::{NewOrder, OrderId, OrderStatus, SaleDerivationError, StoreId, derive_sales};

use crate::db::{IsolationLevel, RepositoryError, orders, sales};

/// Result of a successful order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    /// Sales records written because the order was placed as `Delivered`.
    pub sales_recorded: u64,
}

/// Result of a successful status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub order_id: OrderId,
    pub previous_status: OrderStatus,
    pub status: OrderStatus,
    /// Whether this update recorded the order's sales.
    pub materialized: bool,
    /// Number of sales records written by this update.
    pub sales_recorded: u64,
}

/// Order lifecycle service.
pub struct OrderLifecycle<'a> {
    pool: &'a PgPool,
    isolation: IsolationLevel,
}

impl<'a> OrderLifecycle<'a> {
    /// Create a new lifecycle service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, isolation: IsolationLevel) -> Self {
        Self { pool, isolation }
    }

    /// Create an order and all of its line items atomically.
    ///
    /// The customer and every product must belong to the order's store. An
    /// order placed as `Delivered` has its sales recorded in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` if the customer or a product is not
    /// part of the order's store.
    /// Returns `OrderError::Storage` if the database fails.
    #[instrument(
        skip(self, order),
        fields(
            store_id = %order.store_id(),
            customer_id = %order.customer_id(),
            item_count = order.items().len(),
            order_id = tracing::field::Empty,
        )
    )]
    pub async fn create_order(&self, order: &NewOrder) -> Result<CreatedOrder, OrderError> {
        let mut tx = self.pool.begin().await?;

        let (order_id, placed_at) = orders::insert_order(&mut *tx, order)
            .await?
            .ok_or_else(|| {
                OrderError::Validation(format!(
                    "customer {} not found in store {}",
                    order.customer_id(),
                    order.store_id()
                ))
            })?;
        tracing::Span::current().record("order_id", tracing::field::display(order_id));

        let inserted = orders::insert_items(&mut *tx, order_id, order)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    OrderError::Validation("a product appears more than once".to_string())
                }
                other => OrderError::from(other),
            })?;

        if usize::try_from(inserted).ok() != Some(order.items().len()) {
            tracing::info!(
                submitted = order.items().len(),
                inserted,
                "Rejected order referencing products outside the store"
            );
            return Err(OrderError::Validation(format!(
                "one or more products not found in store {}",
                order.store_id()
            )));
        }

        let sales_recorded = if order.materializes_on_creation() {
            record_sales(&mut *tx, order_id, order.store_id())
                .await?
                .unwrap_or(0)
        } else {
            0
        };

        tx.commit().await?;

        tracing::info!(%order_id, sales_recorded, "Order created");
        Ok(CreatedOrder {
            order_id,
            placed_at,
            sales_recorded,
        })
    }

    /// Change an order's status, recording its sales on first delivery.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthorizedOrNotFound` if the order does not
    /// belong to `store_id`.
    /// Returns `OrderError::Integrity` if a delivered order has no items or the
    /// ledger holds only part of its sales.
    /// Returns `OrderError::Storage` if the database fails.
    #[instrument(skip(self, status), fields(status = %status))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: &OrderStatus,
        store_id: StoreId,
    ) -> Result<StatusUpdate, OrderError> {
        let mut tx = self.pool.begin().await?;
        self.isolation.apply(&mut *tx).await?;

        let change = orders::update_status_scoped(&mut *tx, order_id, store_id, status)
            .await?
            .ok_or(OrderError::NotAuthorizedOrNotFound { order_id, store_id })?;

        if !change.materializes() {
            tx.commit().await?;
            tracing::info!(previous = %change.previous, "Order status updated");
            return Ok(StatusUpdate {
                order_id,
                previous_status: change.previous,
                status: change.next,
                materialized: false,
                sales_recorded: 0,
            });
        }

        let Some(recorded) = record_sales(&mut *tx, order_id, store_id).await? else {
            tx.commit().await?;
            tracing::info!(
                previous = %change.previous,
                "Order delivered again; sales were recorded on first delivery"
            );
            return Ok(StatusUpdate {
                order_id,
                previous_status: change.previous,
                status: change.next,
                materialized: false,
                sales_recorded: 0,
            });
        };

        tx.commit().await?;

        tracing::info!(
            previous = %change.previous,
            sales_recorded = recorded,
            "Order delivered and sales recorded"
        );
        Ok(StatusUpdate {
            order_id,
            previous_status: change.previous,
            status: change.next,
            materialized: true,
            sales_recorded: recorded,
        })
    }
}

/// Record one sale per item of an order reaching `Delivered`.
///
/// Returns `None` when the ledger already holds the order's complete set of
/// records, which happens when a delivered order is reopened and delivered
/// again.
async fn record_sales(
    conn: &mut PgConnection,
    order_id: OrderId,
    store_id: StoreId,
) -> Result<Option<u64>, OrderError> {
    let items = orders::deliverable_items(&mut *conn, order_id, store_id)
        .await
        .map_err(|e| match e {
            RepositoryError::DataCorruption(detail) => OrderError::integrity(order_id, detail),
            other => OrderError::from(other),
        })?;

    let existing = sales::recorded_for_order(&mut *conn, order_id).await?;
    if existing > 0 {
        if usize::try_from(existing).ok() == Some(items.len()) {
            return Ok(None);
        }
        return Err(OrderError::integrity(
            order_id,
            format!("ledger holds {existing} of {} sales records", items.len()),
        ));
    }

    let records = derive_sales(order_id, store_id, &items).map_err(|e| match e {
        SaleDerivationError::NoItems { .. } => {
            OrderError::integrity(order_id, "delivered order has no items")
        }
        amount @ SaleDerivationError::Amount { .. } => OrderError::integrity(order_id, amount),
    })?;

    let recorded = sales::append(&mut *conn, &records)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                OrderError::integrity(order_id, "sales already recorded for this order")
            }
            other => OrderError::from(other),
        })?;

    Ok(Some(recorded))
}
