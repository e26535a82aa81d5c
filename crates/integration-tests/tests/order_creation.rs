//! Order creation against a live database.
//!
//! Run with: cargo test -p mercato-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rust_decimal::Decimal;

use mercato_api::db::{IsolationLevel, OrderRepository};
use mercato_api::services::{OrderError, OrderLifecycle};
use mercato_core::{LineItem, Money, NewOrder, OrderStatus, ProductId};
use mercato_integration_tests::{TestContext, TestStore};

fn order(store: &TestStore, customer: usize, items: &[(ProductId, i32)]) -> NewOrder {
    NewOrder::new(
        store.customer(customer),
        Money::new(Decimal::new(15000, 2)).unwrap(),
        OrderStatus::parse("Processing").unwrap(),
        store.store_id,
        items
            .iter()
            .map(|&(product_id, quantity)| LineItem {
                product_id,
                quantity,
            })
            .collect(),
    )
    .unwrap()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_create_order_persists_order_and_items() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;

    let created = ctx
        .lifecycle()
        .create_order(&order(&store, 0, &[(store.product(0), 2), (store.product(1), 1)]))
        .await
        .unwrap();

    let repo = OrderRepository::new(&ctx.pool);
    let status = repo.status(created.order_id, store.store_id).await.unwrap();
    assert_eq!(status.unwrap().as_str(), "Processing");
    assert_eq!(
        repo.item_count(created.order_id, store.store_id)
            .await
            .unwrap(),
        2
    );

    // Items carry the order's store
    let item_stores: Vec<i32> =
        sqlx::query_scalar("SELECT store_id FROM commerce.order_item WHERE order_id = $1")
            .bind(created.order_id)
            .fetch_all(&ctx.pool)
            .await
            .unwrap();
    assert!(item_stores.iter().all(|&id| id == store.store_id.as_i32()));

    // The declared total is stored untouched
    let audit = repo.audit(created.order_id, store.store_id).await.unwrap();
    assert_eq!(audit.declared_total, Decimal::new(15000, 2));
    assert_eq!(audit.sales_record_count, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_create_order_with_foreign_product_leaves_nothing_behind() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;
    let other = ctx.seed_store().await;

    let result = ctx
        .lifecycle()
        .create_order(&order(&store, 0, &[(store.product(0), 1), (other.product(0), 1)]))
        .await;

    assert!(matches!(result, Err(OrderError::Validation(_))));
    assert_eq!(ctx.order_count(store.customer(0)).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_create_order_with_unknown_product_leaves_nothing_behind() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;

    let result = ctx
        .lifecycle()
        .create_order(&order(&store, 1, &[(ProductId::new(i32::MAX), 1)]))
        .await;

    assert!(matches!(result, Err(OrderError::Validation(_))));
    assert_eq!(ctx.order_count(store.customer(1)).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_create_order_for_foreign_customer_is_rejected() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;
    let other = ctx.seed_store().await;

    let foreign = NewOrder::new(
        other.customer(0),
        Money::new(Decimal::new(1000, 2)).unwrap(),
        OrderStatus::pending(),
        store.store_id,
        vec![LineItem {
            product_id: store.product(2),
            quantity: 1,
        }],
    )
    .unwrap();

    let result = ctx.lifecycle().create_order(&foreign).await;

    assert!(matches!(result, Err(OrderError::Validation(_))));
    assert_eq!(ctx.order_count(other.customer(0)).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_order_created_as_delivered_records_its_sales() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;

    let order = NewOrder::new(
        store.customer(0),
        Money::new(Decimal::new(6000, 2)).unwrap(),
        OrderStatus::delivered(),
        store.store_id,
        vec![
            LineItem {
                product_id: store.product(0),
                quantity: 1,
            },
            LineItem {
                product_id: store.product(2),
                quantity: 1,
            },
        ],
    )
    .unwrap();

    let created = ctx.lifecycle().create_order(&order).await.unwrap();
    assert_eq!(created.sales_recorded, 2);
    assert_eq!(ctx.sales_count(created.order_id).await, 2);

    // Delivering it again records nothing more
    let update = ctx
        .lifecycle()
        .update_status(created.order_id, &OrderStatus::delivered(), store.store_id)
        .await
        .unwrap();
    assert!(!update.materialized);
    assert_eq!(ctx.sales_count(created.order_id).await, 2);

    let audit = OrderRepository::new(&ctx.pool)
        .audit(created.order_id, store.store_id)
        .await
        .unwrap();
    assert!(audit.fully_materialized());
    assert_eq!(audit.ledger_total, Decimal::new(6000, 2));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (MERCATO_TEST_DATABASE_URL)"]
async fn test_product_moving_stores_during_creation_is_rejected() {
    let ctx = TestContext::new().await;
    let store = ctx.seed_store().await;
    let other = ctx.seed_store().await;
    let moved = store.product(0);

    // Hold the product's row lock while it moves to another store
    let mut mover = ctx.pool.begin().await.unwrap();
    sqlx::query("UPDATE commerce.product SET store_id = $2 WHERE id = $1")
        .bind(moved)
        .bind(other.store_id)
        .execute(&mut *mover)
        .await
        .unwrap();

    let pool = ctx.pool.clone();
    let pending = order(&store, 0, &[(moved, 1)]);
    let handle = tokio::spawn(async move {
        OrderLifecycle::new(&pool, IsolationLevel::default())
            .create_order(&pending)
            .await
    });

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert!(!handle.is_finished(), "creation must wait for the product lock");

    mover.commit().await.unwrap();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(OrderError::Validation(_))));
    assert_eq!(ctx.order_count(store.customer(0)).await, 0);
}
