//! Core types for Mercato.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod principal;
pub mod status;

pub use id::*;
pub use money::{Money, MoneyError};
pub use principal::Principal;
pub use status::*;
