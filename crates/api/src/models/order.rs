//! Order projections.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use mercato_core::{CustomerId, OrderId};

/// One row of a store's order list.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub date_ordered: DateTime<Utc>,
    /// Caller-declared total.
    pub total_amount: Decimal,
    pub status: String,
    pub customer_id: CustomerId,
    pub customer_name: String,
}

/// Declared versus materialized amounts for one order.
///
/// The declared total comes from whoever created the order. The ledger total
/// is the sum of sales records priced from the catalog at delivery. They are
/// reported side by side and never reconciled.
#[derive(Debug, Clone, Serialize)]
pub struct OrderAudit {
    pub order_id: OrderId,
    pub status: String,
    pub declared_total: Decimal,
    pub ledger_total: Decimal,
    pub item_count: i64,
    pub sales_record_count: i64,
    /// `ledger_total - declared_total`; zero before delivery means nothing.
    pub discrepancy: Decimal,
}

impl OrderAudit {
    /// Whether every line item has exactly one sales record.
    #[must_use]
    pub const fn fully_materialized(&self) -> bool {
        self.item_count > 0 && self.sales_record_count == self.item_count
    }
}
