//! HTTP route handlers for the order API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database ping)
//!
//! # Orders (principal required)
//! POST /api/orders                      - Create an order with its items
//! GET  /api/orders                      - Store's orders, newest first
//! PUT  /api/orders/{order_id}/status    - Change status; first delivery records sales
//! GET  /api/orders/{order_id}/audit     - Declared vs recorded totals
//! GET  /api/orders/{order_id}/sales     - Sales records of a delivered order
//!
//! # Lookups for order entry (principal required)
//! GET  /api/orders/products             - Store catalog with units ordered
//! GET  /api/orders/customers            - Store customers
//! ```

pub mod health;
pub mod orders;

use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    routing::{get, put},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list).post(orders::create))
        .route("/products", get(orders::products))
        .route("/customers", get(orders::customers))
        .route("/{order_id}/status", put(orders::update_status))
        .route("/{order_id}/audit", get(orders::audit))
        .route("/{order_id}/sales", get(orders::sales))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/orders", order_routes())
}

/// Build the complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let request_timeout = state.config().request_timeout();

    routes()
        // Dropping a timed-out handler rolls back its open transaction
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    store_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
