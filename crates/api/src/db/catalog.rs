//! Catalog and customer directory lookups.
//!
//! Products and customers are managed elsewhere; this module only reads them,
//! always scoped to one store.

use rust_decimal::Decimal;
use sqlx::PgPool;

use mercato_core::{CustomerId, ProductId, StoreId};

use super::RepositoryError;
use crate::models::catalog::{CustomerListing, ProductListing};

#[derive(Debug, sqlx::FromRow)]
struct ProductListingRow {
    id: i32,
    product_name: String,
    product_category: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    total_sold: i64,
}

impl From<ProductListingRow> for ProductListing {
    fn from(row: ProductListingRow) -> Self {
        Self {
            product_id: ProductId::new(row.id),
            product_name: row.product_name,
            product_category: row.product_category,
            price: row.price,
            stock_quantity: row.stock_quantity,
            total_sold: row.total_sold,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerListingRow {
    id: i32,
    customer_name: String,
}

impl From<CustomerListingRow> for CustomerListing {
    fn from(row: CustomerListingRow) -> Self {
        Self {
            customer_id: CustomerId::new(row.id),
            customer_name: row.customer_name,
        }
    }
}

/// Repository for store-scoped catalog and customer lookups.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a store's products with the units ordered so far.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let rows: Vec<ProductListingRow> = sqlx::query_as(
            r"
            SELECT p.id, p.product_name, p.product_category, p.price, p.stock_quantity,
                   COALESCE(SUM(oi.quantity), 0)::BIGINT AS total_sold
            FROM commerce.product p
            LEFT JOIN commerce.order_item oi
                   ON oi.product_id = p.id AND oi.store_id = p.store_id
            WHERE p.store_id = $1
            GROUP BY p.id
            ORDER BY p.product_name, p.id
            ",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductListing::from).collect())
    }

    /// List a store's customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_customers(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<CustomerListing>, RepositoryError> {
        let rows: Vec<CustomerListingRow> = sqlx::query_as(
            r"
            SELECT id, customer_name
            FROM commerce.customer
            WHERE store_id = $1
            ORDER BY customer_name, id
            ",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CustomerListing::from).collect())
    }
}
