//! The HTTP API served on a real socket against a live database.
//!
//! Run with: cargo test -p mercato-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use mercato_api::middleware::{STORE_ID_HEADER, STORE_ROLE_HEADER};
use mercato_integration_tests::{TestContext, TestStore};

fn as_role(
    client: &Client,
    method: reqwest::Method,
    url: String,
    store: &TestStore,
    role: &str,
) -> reqwest::RequestBuilder {
    client
        .request(method, url)
        .header(STORE_ID_HEADER, store.store_id.to_string())
        .header(STORE_ROLE_HEADER, role)
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_readiness() {
    let ctx = TestContext::new().await;
    let base = ctx.spawn_server().await;

    let response = reqwest::get(format!("{base}/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_order_flow_over_http() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;
    let base = ctx.spawn_server().await;
    let client = Client::new();

    // Create
    let response = as_role(&client, reqwest::Method::POST, format!("{base}/api/orders"), &store, "staff")
        .json(&json!({
            "customerId": store.customer(0),
            "totalAmount": "150.00",
            "status": "Processing",
            "items": [
                {"productId": store.product(0), "quantity": 2},
                {"productId": store.product(1), "quantity": 1},
            ],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    let order_id = created["orderId"].as_i64().unwrap();

    // Listed for the store
    let orders: Value = as_role(&client, reqwest::Method::GET, format!("{base}/api/orders"), &store, "viewer")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        orders
            .as_array()
            .unwrap()
            .iter()
            .any(|o| o["order_id"].as_i64() == Some(order_id))
    );

    // Deliver
    let response = as_role(
        &client,
        reqwest::Method::PUT,
        format!("{base}/api/orders/{order_id}/status"),
        &store,
        "owner",
    )
    .json(&json!({"status": "Delivered"}))
    .send()
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let update: Value = response.json().await.unwrap();
    assert_eq!(update["materialized"], true);
    assert_eq!(update["salesRecorded"], 2);
    assert_eq!(update["previousStatus"], "Processing");

    // Deliver again
    let update: Value = as_role(
        &client,
        reqwest::Method::PUT,
        format!("{base}/api/orders/{order_id}/status"),
        &store,
        "owner",
    )
    .json(&json!({"status": "Delivered"}))
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(update["materialized"], false);

    // Audit shows both totals
    let audit: Value = as_role(
        &client,
        reqwest::Method::GET,
        format!("{base}/api/orders/{order_id}/audit"),
        &store,
        "viewer",
    )
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(audit["declared_total"], "150.00");
    assert_eq!(audit["ledger_total"], "125.00");
    assert_eq!(audit["fully_materialized"], true);

    // Sales records
    let sales: Value = as_role(
        &client,
        reqwest::Method::GET,
        format!("{base}/api/orders/{order_id}/sales"),
        &store,
        "viewer",
    )
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(sales.as_array().unwrap().len(), 2);

    // Catalog counts units ordered
    let products: Value = as_role(
        &client,
        reqwest::Method::GET,
        format!("{base}/api/orders/products"),
        &store,
        "viewer",
    )
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    let kettle = products
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["product_id"].as_i64() == Some(i64::from(store.product(0).as_i32())))
        .unwrap();
    assert_eq!(kettle["total_sold"], 2);

    let customers: Value = as_role(
        &client,
        reqwest::Method::GET,
        format!("{base}/api/orders/customers"),
        &store,
        "viewer",
    )
    .send()
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(customers.as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_other_store_gets_not_found() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;
    let other = ctx.seed_store().await;
    let order_id = ctx
        .create_order(
            &store,
            rust_decimal::Decimal::new(5000, 2),
            "Processing",
            &[(store.product(0), 1)],
        )
        .await;
    let base = ctx.spawn_server().await;
    let client = Client::new();

    let response = as_role(
        &client,
        reqwest::Method::PUT,
        format!("{base}/api/orders/{order_id}/status"),
        &other,
        "owner",
    )
    .json(&json!({"status": "Delivered"}))
    .send()
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "not_authorized_or_not_found");

    for path in ["audit", "sales"] {
        let response = as_role(
            &client,
            reqwest::Method::GET,
            format!("{base}/api/orders/{order_id}/{path}"),
            &other,
            "viewer",
        )
        .send()
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }

    assert_eq!(ctx.raw_status(order_id).await.as_deref(), Some("Processing"));
    assert_eq!(ctx.sales_count(order_id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_create_with_foreign_product_is_bad_request() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;
    let other = ctx.seed_store().await;
    let base = ctx.spawn_server().await;

    let response = as_role(
        &Client::new(),
        reqwest::Method::POST,
        format!("{base}/api/orders"),
        &store,
        "owner",
    )
    .json(&json!({
        "customer_id": store.customer(1),
        "total_amount": 10,
        "status": "Pending",
        "items": [{"product_id": other.product(2), "quantity": 1}],
    }))
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "validation_error");
    assert_eq!(ctx.order_count(store.customer(1)).await, 0);
}
