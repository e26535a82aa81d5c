//! HTTP middleware and extractors for the order API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span with `request_id` and `store_id` fields)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Timeout (drops the handler, rolling back its transaction)
//!
//! Principal extraction happens per handler through [`RequirePrincipal`] and
//! [`RequireOrderManager`].

pub mod principal;
pub mod request_id;

pub use principal::{
    PrincipalRejection, RequireOrderManager, RequirePrincipal, STORE_ID_HEADER, STORE_ROLE_HEADER,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
