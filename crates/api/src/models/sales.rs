//! Sales ledger records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mercato_core::{CustomerId, Money, OrderId, ProductId, SaleChannel, SalesRecordId, StoreId};

/// A stored, immutable sales record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRecord {
    pub id: SalesRecordId,
    /// Order this sale was materialized from; `None` for non-order channels.
    pub order_id: Option<OrderId>,
    /// Order placement time, not delivery time.
    pub sale_date: DateTime<Utc>,
    pub channel: SaleChannel,
    pub product_id: ProductId,
    pub quantity_sold: i32,
    /// Catalog price when the order was delivered.
    pub unit_price_at_sale: Money,
    pub total_sale_amount: Money,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    /// When the ledger row was written.
    pub recorded_at: DateTime<Utc>,
}
