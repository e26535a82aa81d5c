//! Read models returned by repositories and serialized by routes.

pub mod catalog;
pub mod order;
pub mod sales;

pub use catalog::{CustomerListing, ProductListing};
pub use order::{OrderAudit, OrderSummary};
pub use sales::SalesRecord;
