//! Business logic services.
//!
//! # Services
//!
//! - `orders` - Order lifecycle engine (creation, status transitions, sales materialization)

pub mod orders;

pub use orders::{CreatedOrder, OrderError, OrderLifecycle, StatusUpdate};
