//! Order creation input and sales derivation.
//!
//! Everything here is pure: the API crate does the I/O and calls into these
//! functions to decide what to write.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CustomerId, Money, MoneyError, OrderId, OrderStatus, ProductId, SaleChannel, StoreId,
};

/// Reasons an order creation request is rejected before touching storage.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    /// The order has no line items.
    #[error("order must contain at least one item")]
    NoItems,
    /// The order has more line items than a single order may carry.
    #[error("order may contain at most {max} items")]
    TooManyItems {
        /// Maximum number of items.
        max: usize,
    },
    /// A line item's quantity is zero or negative.
    #[error("quantity for product {product_id} must be a positive integer")]
    NonPositiveQuantity {
        /// Product of the offending line.
        product_id: ProductId,
    },
    /// The same product appears on more than one line.
    #[error("product {product_id} appears more than once")]
    DuplicateProduct {
        /// The repeated product.
        product_id: ProductId,
    },
    /// A referenced id is zero or negative.
    #[error("{field} must be a positive id")]
    InvalidId {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The declared total is zero.
    #[error("total_amount must be greater than zero")]
    ZeroTotal,
}

/// A single requested line: a product and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product being ordered.
    pub product_id: ProductId,
    /// Number of units, always positive once validated.
    pub quantity: i32,
}

/// A validated order creation request.
///
/// The declared total is whatever the caller said the order is worth. It is
/// stored as-is and never reconciled with catalog prices; the sales ledger
/// carries the catalog-derived amounts separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    customer_id: CustomerId,
    declared_total: Money,
    status: OrderStatus,
    store_id: StoreId,
    items: Vec<LineItem>,
}

impl NewOrder {
    /// Upper bound on line items per order.
    pub const MAX_ITEMS: usize = 500;

    /// Validate an order creation request.
    ///
    /// # Errors
    ///
    /// Returns [`OrderValidationError`] when the item list is empty or too
    /// long, a quantity is not positive, a product is listed twice, an id is
    /// not positive, or the declared total is zero.
    pub fn new(
        customer_id: CustomerId,
        declared_total: Money,
        status: OrderStatus,
        store_id: StoreId,
        items: Vec<LineItem>,
    ) -> Result<Self, OrderValidationError> {
        if customer_id.as_i32() <= 0 {
            return Err(OrderValidationError::InvalidId {
                field: "customer_id",
            });
        }
        if store_id.as_i32() <= 0 {
            return Err(OrderValidationError::InvalidId { field: "store_id" });
        }
        if declared_total.is_zero() {
            return Err(OrderValidationError::ZeroTotal);
        }
        if items.is_empty() {
            return Err(OrderValidationError::NoItems);
        }
        if items.len() > Self::MAX_ITEMS {
            return Err(OrderValidationError::TooManyItems {
                max: Self::MAX_ITEMS,
            });
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.product_id.as_i32() <= 0 {
                return Err(OrderValidationError::InvalidId {
                    field: "product_id",
                });
            }
            if item.quantity <= 0 {
                return Err(OrderValidationError::NonPositiveQuantity {
                    product_id: item.product_id,
                });
            }
            if !seen.insert(item.product_id) {
                return Err(OrderValidationError::DuplicateProduct {
                    product_id: item.product_id,
                });
            }
        }

        Ok(Self {
            customer_id,
            declared_total,
            status,
            store_id,
            items,
        })
    }

    /// Customer placing the order.
    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Caller-declared order total.
    #[must_use]
    pub const fn declared_total(&self) -> Money {
        self.declared_total
    }

    /// Initial status.
    #[must_use]
    pub const fn status(&self) -> &OrderStatus {
        &self.status
    }

    /// Whether the order's sales are recorded as part of its creation.
    ///
    /// An order placed directly as `Delivered` reaches the terminal status
    /// without any later transition, so creation itself records its sales.
    #[must_use]
    pub fn materializes_on_creation(&self) -> bool {
        self.status.is_terminal()
    }

    /// Store the order is created in.
    #[must_use]
    pub const fn store_id(&self) -> StoreId {
        self.store_id
    }

    /// Line items, in submission order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Product ids in submission order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<i32> {
        self.items.iter().map(|i| i.product_id.as_i32()).collect()
    }

    /// Quantities in submission order.
    #[must_use]
    pub fn quantities(&self) -> Vec<i32> {
        self.items.iter().map(|i| i.quantity).collect()
    }
}

/// The status an order held before an update and the status it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Status before the update.
    pub previous: OrderStatus,
    /// Status after the update.
    pub next: OrderStatus,
}

impl StatusChange {
    /// Whether this change is the order's first arrival at the terminal status.
    ///
    /// Only the transition into `Delivered` materializes sales. Setting
    /// `Delivered` on an order that is already delivered does not.
    #[must_use]
    pub fn materializes(&self) -> bool {
        self.next.is_terminal() && !self.previous.is_terminal()
    }
}

/// An order line joined with the data needed to record its sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverableItem {
    /// Product sold.
    pub product_id: ProductId,
    /// Units sold.
    pub quantity: i32,
    /// The product's catalog price at the moment of materialization.
    pub current_unit_price: Money,
    /// Customer who placed the order.
    pub customer_id: CustomerId,
    /// When the order was placed; becomes the sale date.
    pub placed_at: DateTime<Utc>,
}

/// A sales record ready to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSalesRecord {
    /// Order the sale was derived from.
    pub order_id: OrderId,
    /// Sale date, copied from the order's placement time.
    pub sale_date: DateTime<Utc>,
    /// Channel the sale came through.
    pub channel: SaleChannel,
    /// Product sold.
    pub product_id: ProductId,
    /// Units sold.
    pub quantity_sold: i32,
    /// Catalog unit price when the sale was recorded.
    pub unit_price_at_sale: Money,
    /// `unit_price_at_sale` × `quantity_sold`.
    pub total_sale_amount: Money,
    /// Store that made the sale.
    pub store_id: StoreId,
    /// Customer who bought.
    pub customer_id: CustomerId,
}

/// Reasons sales cannot be derived from a delivered order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleDerivationError {
    /// The order has no items to derive sales from.
    #[error("order {order_id} has no items")]
    NoItems {
        /// The empty order.
        order_id: OrderId,
    },
    /// A line's amount cannot be represented.
    #[error("sale amount for product {product_id} is out of range: {source}")]
    Amount {
        /// Product of the offending line.
        product_id: ProductId,
        /// Underlying arithmetic error.
        source: MoneyError,
    },
}

/// Derive one online sales record per delivered item.
///
/// # Errors
///
/// Returns [`SaleDerivationError::NoItems`] when `items` is empty and
/// [`SaleDerivationError::Amount`] when a line total cannot be stored.
pub fn derive_sales(
    order_id: OrderId,
    store_id: StoreId,
    items: &[DeliverableItem],
) -> Result<Vec<NewSalesRecord>, SaleDerivationError> {
    if items.is_empty() {
        return Err(SaleDerivationError::NoItems { order_id });
    }

    items
        .iter()
        .map(|item| {
            let total = item
                .current_unit_price
                .times(item.quantity)
                .map_err(|source| SaleDerivationError::Amount {
                    product_id: item.product_id,
                    source,
                })?;

            Ok(NewSalesRecord {
                order_id,
                sale_date: item.placed_at,
                channel: SaleChannel::Online,
                product_id: item.product_id,
                quantity_sold: item.quantity,
                unit_price_at_sale: item.current_unit_price,
                total_sale_amount: total,
                store_id,
                customer_id: item.customer_id,
            })
        })
        .collect()
}

/// Sum the totals of a set of sales records.
///
/// # Errors
///
/// Returns [`MoneyError`] if the sum cannot be represented.
pub fn ledger_total(records: &[NewSalesRecord]) -> Result<Money, MoneyError> {
    records
        .iter()
        .try_fold(Money::ZERO, |acc, r| acc.checked_add(r.total_sale_amount))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;

    fn money(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2)).unwrap()
    }

    fn item(product: i32, quantity: i32) -> LineItem {
        LineItem {
            product_id: ProductId::new(product),
            quantity,
        }
    }

    fn new_order(items: Vec<LineItem>) -> Result<NewOrder, OrderValidationError> {
        NewOrder::new(
            CustomerId::new(7),
            money(15000),
            OrderStatus::pending(),
            StoreId::new(1),
            items,
        )
    }

    #[test]
    fn test_valid_order() {
        let order = new_order(vec![item(1, 2), item(2, 1)]).unwrap();
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.product_ids(), vec![1, 2]);
        assert_eq!(order.quantities(), vec![2, 1]);
        assert_eq!(order.declared_total(), money(15000));
    }

    #[test]
    fn test_empty_items_rejected() {
        assert_eq!(new_order(vec![]), Err(OrderValidationError::NoItems));
    }

    #[test]
    fn test_too_many_items_rejected() {
        let items = (1..=501).map(|p| item(p, 1)).collect();
        assert!(matches!(
            new_order(items),
            Err(OrderValidationError::TooManyItems { max: 500 })
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert_eq!(
            new_order(vec![item(1, 0)]),
            Err(OrderValidationError::NonPositiveQuantity {
                product_id: ProductId::new(1)
            })
        );
        assert!(new_order(vec![item(1, 1), item(2, -4)]).is_err());
    }

    #[test]
    fn test_duplicate_product_rejected() {
        assert_eq!(
            new_order(vec![item(3, 1), item(4, 1), item(3, 2)]),
            Err(OrderValidationError::DuplicateProduct {
                product_id: ProductId::new(3)
            })
        );
    }

    #[test]
    fn test_invalid_ids_rejected() {
        assert_eq!(
            new_order(vec![item(0, 1)]),
            Err(OrderValidationError::InvalidId {
                field: "product_id"
            })
        );
        let result = NewOrder::new(
            CustomerId::new(0),
            money(100),
            OrderStatus::pending(),
            StoreId::new(1),
            vec![item(1, 1)],
        );
        assert_eq!(
            result,
            Err(OrderValidationError::InvalidId {
                field: "customer_id"
            })
        );
    }

    #[test]
    fn test_zero_total_rejected() {
        let result = NewOrder::new(
            CustomerId::new(1),
            Money::ZERO,
            OrderStatus::pending(),
            StoreId::new(1),
            vec![item(1, 1)],
        );
        assert_eq!(result, Err(OrderValidationError::ZeroTotal));
    }

    #[test]
    fn test_status_change_materializes_only_on_first_delivery() {
        let change = |from: &str, to: &str| StatusChange {
            previous: OrderStatus::parse(from).unwrap(),
            next: OrderStatus::parse(to).unwrap(),
        };

        assert!(change("Pending", "Delivered").materializes());
        assert!(change("Processing", "Delivered").materializes());
        assert!(!change("Delivered", "Delivered").materializes());
        assert!(!change("Pending", "Processing").materializes());
        assert!(!change("Delivered", "Processing").materializes());
    }

    #[test]
    fn test_order_placed_as_delivered_materializes_on_creation() {
        let order = |status: OrderStatus| {
            NewOrder::new(
                CustomerId::new(1),
                money(1000),
                status,
                StoreId::new(1),
                vec![item(1, 1)],
            )
            .unwrap()
        };

        assert!(order(OrderStatus::delivered()).materializes_on_creation());
        assert!(!order(OrderStatus::pending()).materializes_on_creation());
        assert!(!order(OrderStatus::parse("delivered").unwrap()).materializes_on_creation());
    }

    #[test]
    fn test_derive_sales_uses_current_price_and_placement_date() {
        let placed_at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let items = vec![
            DeliverableItem {
                product_id: ProductId::new(1),
                quantity: 2,
                current_unit_price: money(5000),
                customer_id: CustomerId::new(7),
                placed_at,
            },
            DeliverableItem {
                product_id: ProductId::new(2),
                quantity: 1,
                current_unit_price: money(6525),
                customer_id: CustomerId::new(7),
                placed_at,
            },
        ];

        let sales = derive_sales(OrderId::new(11), StoreId::new(1), &items).unwrap();

        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].total_sale_amount, money(10000));
        assert_eq!(sales[1].total_sale_amount, money(6525));
        assert!(sales.iter().all(|s| s.sale_date == placed_at));
        assert!(sales.iter().all(|s| s.channel == SaleChannel::Online));
        assert!(sales.iter().all(|s| s.order_id == OrderId::new(11)));
        // Ledger total follows catalog prices, not the declared 150.00
        assert_eq!(ledger_total(&sales).unwrap(), money(16525));
    }

    #[test]
    fn test_derive_sales_rejects_empty_order() {
        assert_eq!(
            derive_sales(OrderId::new(5), StoreId::new(1), &[]),
            Err(SaleDerivationError::NoItems {
                order_id: OrderId::new(5)
            })
        );
    }
}
