//! Sales ledger: append-only records of completed sales.
//!
//! Rows are only ever inserted, by the lifecycle engine, inside the same
//! transaction that moves an order to `Delivered`. A database trigger rejects
//! updates and deletes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use mercato_core::{
    CustomerId, Money, NewSalesRecord, OrderId, ProductId, SaleChannel, SalesRecordId, StoreId,
};

use super::RepositoryError;
use crate::models::sales::SalesRecord;

#[derive(Debug, sqlx::FromRow)]
struct SalesRecordRow {
    id: i32,
    order_id: Option<i32>,
    sale_date: DateTime<Utc>,
    sale_channel: String,
    product_id: i32,
    quantity_sold: i32,
    unit_price_at_sale: Decimal,
    total_sale_amount: Decimal,
    store_id: i32,
    customer_id: i32,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<SalesRecordRow> for SalesRecord {
    type Error = RepositoryError;

    fn try_from(row: SalesRecordRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("sales record {}: {what}: {e}", row.id))
        };

        Ok(Self {
            id: SalesRecordId::new(row.id),
            order_id: row.order_id.map(OrderId::new),
            sale_date: row.sale_date,
            channel: row
                .sale_channel
                .parse::<SaleChannel>()
                .map_err(|e| corrupt("channel", &e))?,
            product_id: ProductId::new(row.product_id),
            quantity_sold: row.quantity_sold,
            unit_price_at_sale: Money::new(row.unit_price_at_sale)
                .map_err(|e| corrupt("unit price", &e))?,
            total_sale_amount: Money::new(row.total_sale_amount)
                .map_err(|e| corrupt("total", &e))?,
            store_id: StoreId::new(row.store_id),
            customer_id: CustomerId::new(row.customer_id),
            recorded_at: row.recorded_at,
        })
    }
}

/// Count the ledger rows already recorded for an order.
///
/// Callers hold the order's row lock, so the count cannot change underneath
/// them.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn recorded_for_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<i64, RepositoryError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM commerce.sales_record WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(conn)
        .await?;

    Ok(count)
}

/// Append sales records in a single multi-row insert.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if any `(order_id, product_id)` pair is
/// already in the ledger, and `RepositoryError::Database` for any other
/// failure.
pub async fn append(
    conn: &mut PgConnection,
    records: &[NewSalesRecord],
) -> Result<u64, RepositoryError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO commerce.sales_record (
            order_id, sale_date, sale_channel, product_id, quantity_sold,
            unit_price_at_sale, total_sale_amount, store_id, customer_id
        ) ",
    );

    builder.push_values(records, |mut row, record| {
        row.push_bind(record.order_id)
            .push_bind(record.sale_date)
            .push_bind(record.channel.as_str())
            .push_bind(record.product_id)
            .push_bind(record.quantity_sold)
            .push_bind(record.unit_price_at_sale)
            .push_bind(record.total_sale_amount)
            .push_bind(record.store_id)
            .push_bind(record.customer_id);
    });

    let result = builder
        .build()
        .execute(conn)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "sales record for this order"))?;

    Ok(result.rows_affected())
}

/// Repository for reading the sales ledger.
pub struct SalesLedgerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SalesLedgerRepository<'a> {
    /// Create a new sales ledger repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the sales records materialized from one order of a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn for_order(
        &self,
        order_id: OrderId,
        store_id: StoreId,
    ) -> Result<Vec<SalesRecord>, RepositoryError> {
        let rows: Vec<SalesRecordRow> = sqlx::query_as(
            r"
            SELECT id, order_id, sale_date, sale_channel, product_id, quantity_sold,
                   unit_price_at_sale, total_sale_amount, store_id, customer_id,
                   recorded_at
            FROM commerce.sales_record
            WHERE order_id = $1 AND store_id = $2
            ORDER BY product_id
            ",
        )
        .bind(order_id)
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(SalesRecord::try_from).collect()
    }

    /// Count every ledger row for a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_store(&self, store_id: StoreId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM commerce.sales_record WHERE store_id = $1",
        )
        .bind(store_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
