//! Order lifecycle API handlers.
//!
//! Request bodies accept both `snake_case` and `camelCase` field names.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercato_core::{
    CustomerId, LineItem, Money, NewOrder, OrderId, OrderStatus, Principal, ProductId, StoreId,
};

use crate::db::{CatalogRepository, OrderRepository, SalesLedgerRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireOrderManager, RequirePrincipal};
use crate::models::{CustomerListing, OrderAudit, OrderSummary, ProductListing, SalesRecord};
use crate::services::OrderError;
use crate::state::AppState;

/// Default and maximum page size for order listings.
const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

/// JSON body extractor whose rejections use the API error format.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the API error format.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

// =============================================================================
// Request / response bodies
// =============================================================================

/// One requested line item.
#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    #[serde(alias = "productId")]
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Order creation request.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(alias = "customerId")]
    pub customer_id: CustomerId,
    #[serde(alias = "totalAmount")]
    pub total_amount: Decimal,
    pub status: String,
    /// Optional; must match the caller's store when present.
    #[serde(default, alias = "storeId")]
    pub store_id: Option<StoreId>,
    pub items: Vec<LineItemRequest>,
}

/// Status update request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    /// Optional; must match the caller's store when present.
    #[serde(default, alias = "storeId")]
    pub store_id: Option<StoreId>,
}

/// Order listing query.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderResponse {
    order_id: OrderId,
    placed_at: chrono::DateTime<chrono::Utc>,
    sales_recorded: u64,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusResponse {
    order_id: OrderId,
    previous_status: OrderStatus,
    status: OrderStatus,
    materialized: bool,
    sales_recorded: u64,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct AuditResponse {
    #[serde(flatten)]
    audit: OrderAudit,
    fully_materialized: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/orders`
pub async fn create(
    State(state): State<AppState>,
    RequireOrderManager(principal): RequireOrderManager,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    let order = new_order(&principal, body)?;
    let created = state.lifecycle().create_order(&order).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: created.order_id,
            placed_at: created.placed_at,
            sales_recorded: created.sales_recorded,
            message: "Order and items saved successfully",
        }),
    ))
}

/// `PUT /api/orders/{order_id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    RequireOrderManager(principal): RequireOrderManager,
    Path(order_id): Path<String>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse> {
    let order_id = parse_order_id(&order_id)?;
    check_store(&principal, body.store_id)?;
    let status = OrderStatus::parse(&body.status).map_err(OrderError::from)?;

    let update = state
        .lifecycle()
        .update_status(order_id, &status, principal.store_id)
        .await?;

    let message = if update.materialized {
        "Order marked as Delivered and sales recorded"
    } else {
        "Order status updated successfully"
    };

    Ok(Json(UpdateStatusResponse {
        order_id: update.order_id,
        previous_status: update.previous_status,
        status: update.status,
        materialized: update.materialized,
        sales_recorded: update.sales_recorded,
        message,
    }))
}

/// `GET /api/orders`
pub async fn list(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> Result<Json<Vec<OrderSummary>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let orders = OrderRepository::new(state.pool())
        .list_for_store(principal.store_id, limit)
        .await?;

    Ok(Json(orders))
}

/// `GET /api/orders/{order_id}/audit`
pub async fn audit(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse> {
    let order_id = parse_order_id(&order_id)?;

    let audit = OrderRepository::new(state.pool())
        .audit(order_id, principal.store_id)
        .await
        .map_err(|e| scoped_not_found(e, order_id, principal.store_id))?;

    Ok(Json(AuditResponse {
        fully_materialized: audit.fully_materialized(),
        audit,
    }))
}

/// `GET /api/orders/{order_id}/sales`
pub async fn sales(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(order_id): Path<String>,
) -> Result<Json<Vec<SalesRecord>>> {
    let order_id = parse_order_id(&order_id)?;

    if OrderRepository::new(state.pool())
        .status(order_id, principal.store_id)
        .await?
        .is_none()
    {
        return Err(OrderError::NotAuthorizedOrNotFound {
            order_id,
            store_id: principal.store_id,
        }
        .into());
    }

    let records = SalesLedgerRepository::new(state.pool())
        .for_order(order_id, principal.store_id)
        .await?;

    Ok(Json(records))
}

/// `GET /api/orders/products`
pub async fn products(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<ProductListing>>> {
    let products = CatalogRepository::new(state.pool())
        .list_products(principal.store_id)
        .await?;

    Ok(Json(products))
}

/// `GET /api/orders/customers`
pub async fn customers(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<CustomerListing>>> {
    let customers = CatalogRepository::new(state.pool())
        .list_customers(principal.store_id)
        .await?;

    Ok(Json(customers))
}

// =============================================================================
// Helpers
// =============================================================================

fn new_order(principal: &Principal, body: CreateOrderRequest) -> Result<NewOrder> {
    check_store(principal, body.store_id)?;

    let declared_total = Money::new(body.total_amount).map_err(OrderError::from)?;
    let status = OrderStatus::parse(&body.status).map_err(OrderError::from)?;
    let items = body
        .items
        .into_iter()
        .map(|item| LineItem {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();

    let order = NewOrder::new(
        body.customer_id,
        declared_total,
        status,
        principal.store_id,
        items,
    )
    .map_err(OrderError::from)?;

    Ok(order)
}

fn check_store(principal: &Principal, claimed: Option<StoreId>) -> Result<()> {
    match claimed {
        Some(store_id) if !principal.owns(claimed) => Err(AppError::ForeignStore { store_id }),
        _ => Ok(()),
    }
}

fn parse_order_id(raw: &str) -> Result<OrderId> {
    raw.parse()
        .map_err(|e: mercato_core::ParseIdError| AppError::BadRequest(e.to_string()))
}

fn scoped_not_found(
    err: crate::db::RepositoryError,
    order_id: OrderId,
    store_id: StoreId,
) -> AppError {
    match err {
        crate::db::RepositoryError::NotFound => {
            OrderError::NotAuthorizedOrNotFound { order_id, store_id }.into()
        }
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mercato_core::StoreRole;

    use super::*;

    fn owner(store: i32) -> Principal {
        Principal::new(StoreId::new(store), StoreRole::Owner)
    }

    fn request(json: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_create_request_accepts_camel_case() {
        let body = request(serde_json::json!({
            "customerId": 3,
            "totalAmount": "150.00",
            "status": "Processing",
            "storeId": 1,
            "items": [{"productId": 10, "quantity": 2}],
        }));

        let order = new_order(&owner(1), body).unwrap();
        assert_eq!(order.customer_id(), CustomerId::new(3));
        assert_eq!(order.store_id(), StoreId::new(1));
        assert_eq!(order.items().len(), 1);
    }

    #[test]
    fn test_order_store_comes_from_principal() {
        let body = request(serde_json::json!({
            "customer_id": 3,
            "total_amount": 20,
            "status": "Pending",
            "items": [{"product_id": 10, "quantity": 1}],
        }));

        let order = new_order(&owner(7), body).unwrap();
        assert_eq!(order.store_id(), StoreId::new(7));
    }

    #[test]
    fn test_foreign_store_is_rejected() {
        let body = request(serde_json::json!({
            "customer_id": 3,
            "total_amount": 20,
            "status": "Pending",
            "store_id": 2,
            "items": [{"product_id": 10, "quantity": 1}],
        }));

        let err = new_order(&owner(1), body).unwrap_err();
        assert!(matches!(err, AppError::ForeignStore { store_id } if store_id == StoreId::new(2)));
    }

    #[test]
    fn test_invalid_orders_are_validation_errors() {
        let cases = [
            serde_json::json!({
                "customer_id": 3, "total_amount": 20, "status": "Pending", "items": [],
            }),
            serde_json::json!({
                "customer_id": 3, "total_amount": 20, "status": "Pending",
                "items": [{"product_id": 10, "quantity": 0}],
            }),
            serde_json::json!({
                "customer_id": 3, "total_amount": -5, "status": "Pending",
                "items": [{"product_id": 10, "quantity": 1}],
            }),
            serde_json::json!({
                "customer_id": 3, "total_amount": 20, "status": "  ",
                "items": [{"product_id": 10, "quantity": 1}],
            }),
        ];

        for case in cases {
            let err = new_order(&owner(1), request(case.clone())).unwrap_err();
            assert!(
                matches!(err, AppError::Order(OrderError::Validation(_))),
                "{case}"
            );
        }
    }

    #[test]
    fn test_parse_order_id() {
        assert_eq!(parse_order_id("42").unwrap(), OrderId::new(42));
        assert!(matches!(
            parse_order_id("abc").unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(parse_order_id("0").is_err());
    }
}
