//! Catalog and customer directory projections.

use rust_decimal::Decimal;
use serde::Serialize;

use mercato_core::{CustomerId, ProductId};

/// A product as listed for order entry.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_category: Option<String>,
    /// Current catalog price.
    pub price: Decimal,
    pub stock_quantity: i32,
    /// Units on all of the store's orders, delivered or not.
    pub total_sold: i64,
}

/// A customer as listed for order entry.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerListing {
    pub customer_id: CustomerId,
    pub customer_name: String,
}
