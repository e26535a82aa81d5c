//! Mercato order lifecycle API library.
//!
//! The binary in `main.rs` wires these modules together; integration tests and
//! the CLI use them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
