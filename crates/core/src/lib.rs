//! Mercato Core - Shared domain types.
//!
//! This crate provides the types shared by all Mercato components:
//! - `api` - Order lifecycle HTTP service
//! - `cli` - Command-line tools for migrations, seeding and audits
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Everything that decides *whether* an order is valid or
//! *whether* a status change materializes sales lives here so it can be tested
//! without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, statuses, roles and principals
//! - [`order`] - Order creation input validation and sale derivation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod order;
pub mod types;

pub use order::*;
pub use types::*;
