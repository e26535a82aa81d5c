//! Order inspection commands.
//!
//! # Usage
//!
//! ```bash
//! # Audit one order of a store
//! mercato orders audit --store 1 --order 42
//!
//! # Audit a store's most recent orders, reporting only problems
//! mercato orders audit --store 1 --limit 200
//! ```

use mercato_api::db::{OrderRepository, RepositoryError, SalesLedgerRepository};
use mercato_api::models::OrderAudit;
use mercato_core::{OrderId, OrderStatus, StoreId};
use tracing::{info, warn};

/// What an audit found wrong with one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The ledger holds some but not all of the order's records, or a
    /// delivered order has none.
    IncompleteLedger { items: i64, records: i64 },
    /// Recorded sales add up to something other than the declared total.
    TotalMismatch,
}

/// Classify an audit row.
///
/// An order that was delivered and later reopened keeps its complete ledger
/// and is not flagged.
#[must_use]
pub fn findings(audit: &OrderAudit) -> Vec<Finding> {
    let delivered = OrderStatus::parse(&audit.status).is_ok_and(|s| s.is_terminal());
    let has_ledger = audit.sales_record_count > 0;
    let mut found = Vec::new();

    if (delivered || has_ledger) && !audit.fully_materialized() {
        found.push(Finding::IncompleteLedger {
            items: audit.item_count,
            records: audit.sales_record_count,
        });
    }
    if has_ledger && !audit.discrepancy.is_zero() {
        found.push(Finding::TotalMismatch);
    }

    found
}

/// Audit one order, or a store's recent orders.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the order is not part
/// of the store.
pub async fn audit(
    store: i32,
    order: Option<i32>,
    limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let store_id = StoreId::new(store);
    let pool = super::connect().await?;
    let orders = OrderRepository::new(&pool);

    if let Some(order) = order {
        let order_id = OrderId::new(order);
        let audit = orders.audit(order_id, store_id).await.map_err(|e| match e {
            RepositoryError::NotFound => {
                format!("order {order_id} not found in store {store_id}").into()
            }
            other => Box::<dyn std::error::Error>::from(other),
        })?;
        report(&audit, true);
        return Ok(());
    }

    let summaries = orders.list_for_store(store_id, limit).await?;
    let mut flagged = 0usize;
    for summary in &summaries {
        let audit = orders.audit(summary.order_id, store_id).await?;
        if report(&audit, false) {
            flagged += 1;
        }
    }

    let ledger_size = SalesLedgerRepository::new(&pool)
        .count_for_store(store_id)
        .await?;

    info!(
        %store_id,
        audited = summaries.len(),
        flagged,
        ledger_size,
        "Audit complete"
    );
    Ok(())
}

/// Log an audit; returns whether anything was flagged.
fn report(audit: &OrderAudit, verbose: bool) -> bool {
    let found = findings(audit);

    if verbose || !found.is_empty() {
        info!(
            order_id = %audit.order_id,
            status = %audit.status,
            declared_total = %audit.declared_total,
            ledger_total = %audit.ledger_total,
            items = audit.item_count,
            sales_records = audit.sales_record_count,
            discrepancy = %audit.discrepancy,
            "Order audit"
        );
    }
    for finding in &found {
        warn!(order_id = %audit.order_id, ?finding, "Audit finding");
    }

    !found.is_empty()
}
