//! Order store: orders and their line items.
//!
//! Every statement that touches an existing order joins through
//! `commerce.customer` to prove the order belongs to the caller's store. The
//! ownership check is part of the statement itself, never a separate read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use mercato_core::{
    CustomerId, DeliverableItem, Money, NewOrder, OrderId, OrderStatus, ProductId, StatusChange,
    StoreId,
};

use super::RepositoryError;
use crate::models::order::{OrderAudit, OrderSummary};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InsertedOrderRow {
    id: i32,
    date_ordered: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DeliverableItemRow {
    product_id: i32,
    quantity: i32,
    current_unit_price: Decimal,
    customer_id: i32,
    placed_at: DateTime<Utc>,
}

impl TryFrom<DeliverableItemRow> for DeliverableItem {
    type Error = RepositoryError;

    fn try_from(row: DeliverableItemRow) -> Result<Self, Self::Error> {
        let current_unit_price = Money::new(row.current_unit_price).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid price for product {}: {e}",
                row.product_id
            ))
        })?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            current_unit_price,
            customer_id: CustomerId::new(row.customer_id),
            placed_at: row.placed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    id: i32,
    date_ordered: DateTime<Utc>,
    total_amount: Decimal,
    status: String,
    customer_id: i32,
    customer_name: String,
}

impl From<OrderSummaryRow> for OrderSummary {
    fn from(row: OrderSummaryRow) -> Self {
        Self {
            order_id: OrderId::new(row.id),
            date_ordered: row.date_ordered,
            total_amount: row.total_amount,
            status: row.status,
            customer_id: CustomerId::new(row.customer_id),
            customer_name: row.customer_name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderAuditRow {
    id: i32,
    status: String,
    declared_total: Decimal,
    item_count: i64,
    sales_record_count: i64,
    ledger_total: Decimal,
}

impl From<OrderAuditRow> for OrderAudit {
    fn from(row: OrderAuditRow) -> Self {
        Self {
            order_id: OrderId::new(row.id),
            status: row.status,
            declared_total: row.declared_total,
            ledger_total: row.ledger_total,
            item_count: row.item_count,
            sales_record_count: row.sales_record_count,
            discrepancy: row.ledger_total - row.declared_total,
        }
    }
}

// =============================================================================
// Transactional statements
// =============================================================================

/// Insert an order row for a customer of the order's store.
///
/// The customer row is share-locked so it cannot move to another store
/// before the transaction commits.
///
/// Returns `None` when the customer does not exist in that store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
) -> Result<Option<(OrderId, DateTime<Utc>)>, RepositoryError> {
    let row: Option<InsertedOrderRow> = sqlx::query_as(
        r"
        INSERT INTO commerce.customer_order (customer_id, total_amount, status, date_ordered)
        SELECT c.id, $2, $3, now()
        FROM commerce.customer c
        WHERE c.id = $1 AND c.store_id = $4
        FOR SHARE OF c
        RETURNING id, date_ordered
        ",
    )
    .bind(order.customer_id())
    .bind(order.declared_total())
    .bind(order.status())
    .bind(order.store_id())
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| (OrderId::new(r.id), r.date_ordered)))
}

/// Insert every line item of `order` under `order_id` in one statement.
///
/// Only products that belong to the order's store are inserted; the caller
/// compares the returned row count against the submitted item count. Matched
/// product rows are share-locked so they cannot move to another store before
/// the transaction commits.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a product repeats and
/// `RepositoryError::Database` for any other failure.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    order: &NewOrder,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO commerce.order_item (order_id, product_id, quantity, store_id)
        SELECT $1, p.id, i.quantity, p.store_id
        FROM UNNEST($2::int4[], $3::int4[]) AS i(product_id, quantity)
        JOIN commerce.product p ON p.id = i.product_id AND p.store_id = $4
        FOR SHARE OF p
        ",
    )
    .bind(order_id)
    .bind(order.product_ids())
    .bind(order.quantities())
    .bind(order.store_id())
    .execute(conn)
    .await
    .map_err(|e| RepositoryError::from_insert(e, "order item"))?;

    Ok(result.rows_affected())
}

/// Set an order's status if, and only if, the order belongs to `store_id`.
///
/// The order and its customer are row-locked before the update, so two
/// concurrent updates of the same order serialize and the second observes
/// the first's status as `previous`.
///
/// Returns `None` when no order with that id belongs to the store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn update_status_scoped(
    conn: &mut PgConnection,
    order_id: OrderId,
    store_id: StoreId,
    status: &OrderStatus,
) -> Result<Option<StatusChange>, RepositoryError> {
    let previous: Option<OrderStatus> = sqlx::query_scalar(
        r"
        WITH target AS (
            SELECT o.id, o.status AS previous_status
            FROM commerce.customer_order o
            JOIN commerce.customer c ON c.id = o.customer_id
            WHERE o.id = $1 AND c.store_id = $2
            FOR UPDATE OF o, c
        )
        UPDATE commerce.customer_order o
        SET status = $3, updated_at = now()
        FROM target
        WHERE o.id = target.id
        RETURNING target.previous_status
        ",
    )
    .bind(order_id)
    .bind(store_id)
    .bind(status)
    .fetch_optional(conn)
    .await?;

    Ok(previous.map(|previous| StatusChange {
        previous,
        next: status.clone(),
    }))
}

/// Read an order's items with the current catalog price of each product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
pub async fn deliverable_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    store_id: StoreId,
) -> Result<Vec<DeliverableItem>, RepositoryError> {
    let rows: Vec<DeliverableItemRow> = sqlx::query_as(
        r"
        SELECT oi.product_id, oi.quantity,
               p.price AS current_unit_price,
               o.customer_id,
               o.date_ordered AS placed_at
        FROM commerce.order_item oi
        JOIN commerce.customer_order o ON o.id = oi.order_id
        JOIN commerce.customer c ON c.id = o.customer_id
        JOIN commerce.product p ON p.id = oi.product_id
        WHERE oi.order_id = $1 AND c.store_id = $2
        ORDER BY oi.product_id
        ",
    )
    .bind(order_id)
    .bind(store_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(DeliverableItem::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for store-scoped order projections.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a store's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_store(
        &self,
        store_id: StoreId,
        limit: i64,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows: Vec<OrderSummaryRow> = sqlx::query_as(
            r"
            SELECT o.id, o.date_ordered, o.total_amount, o.status,
                   c.id AS customer_id, c.customer_name
            FROM commerce.customer_order o
            JOIN commerce.customer c ON c.id = o.customer_id
            WHERE c.store_id = $1
            ORDER BY o.date_ordered DESC, o.id DESC
            LIMIT $2
            ",
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }

    /// Compare an order's declared total with what its sales records add up to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not belong to the store.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn audit(
        &self,
        order_id: OrderId,
        store_id: StoreId,
    ) -> Result<OrderAudit, RepositoryError> {
        let row: Option<OrderAuditRow> = sqlx::query_as(
            r"
            SELECT o.id, o.status, o.total_amount AS declared_total,
                   (SELECT COUNT(*) FROM commerce.order_item oi
                     WHERE oi.order_id = o.id) AS item_count,
                   (SELECT COUNT(*) FROM commerce.sales_record s
                     WHERE s.order_id = o.id) AS sales_record_count,
                   COALESCE((SELECT SUM(s.total_sale_amount) FROM commerce.sales_record s
                     WHERE s.order_id = o.id), 0)::NUMERIC(12, 2) AS ledger_total
            FROM commerce.customer_order o
            JOIN commerce.customer c ON c.id = o.customer_id
            WHERE o.id = $1 AND c.store_id = $2
            ",
        )
        .bind(order_id)
        .bind(store_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(OrderAudit::from).ok_or(RepositoryError::NotFound)
    }

    /// Get an order's current status within a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status(
        &self,
        order_id: OrderId,
        store_id: StoreId,
    ) -> Result<Option<OrderStatus>, RepositoryError> {
        let status = sqlx::query_scalar(
            r"
            SELECT o.status
            FROM commerce.customer_order o
            JOIN commerce.customer c ON c.id = o.customer_id
            WHERE o.id = $1 AND c.store_id = $2
            ",
        )
        .bind(order_id)
        .bind(store_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(status)
    }

    /// Count an order's line items within a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn item_count(
        &self,
        order_id: OrderId,
        store_id: StoreId,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM commerce.order_item oi
            JOIN commerce.customer_order o ON o.id = oi.order_id
            JOIN commerce.customer c ON c.id = o.customer_id
            WHERE oi.order_id = $1 AND c.store_id = $2
            ",
        )
        .bind(order_id)
        .bind(store_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
