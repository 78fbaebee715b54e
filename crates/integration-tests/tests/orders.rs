//! Order lifecycle and report tests.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (cargo run -p etic-cli -- migrate)
//! - The API server running (cargo run -p etic-api)
//!
//! Run with: cargo test -p etic-integration-tests -- --ignored

use std::collections::HashSet;

use etic_core::order_number::ORDER_NUMBER_PREFIX;
use etic_integration_tests::{
    TestClient, address, expect_data, expect_error, id_of, simple_order,
};
use futures::future::join_all;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_order_from_catalog_product() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("demo-store").await);

    let resp = owner
        .post(
            &format!("/stores/{store_id}/products"),
            &json!({"title": "Telefon", "price": "45000.00", "compareAtPrice": "50000.00", "quantity": 50}),
        )
        .await;
    let product = expect_data(resp, StatusCode::CREATED).await;

    let resp = owner
        .post(
            &format!("/stores/{store_id}/orders"),
            &json!({
                "email": "buyer@example.com",
                "billingAddress": address(),
                "shippingAddress": address(),
                "items": [{
                    "productId": product["id"],
                    "title": "Telefon",
                    "quantity": 2,
                    "price": "45000.00"
                }]
            }),
        )
        .await;
    let order = expect_data(resp, StatusCode::CREATED).await;

    assert_eq!(order["subtotal"], "90000.00");
    assert_eq!(order["total"], "90000.00");
    assert_eq!(order["orderStatus"], "PENDING");
    assert_eq!(order["paymentStatus"], "PENDING");
    assert_eq!(order["fulfillmentStatus"], "UNFULFILLED");
    assert_eq!(order["currency"], "TRY");
    assert_eq!(order["items"][0]["total"], "90000.00");
    assert_eq!(order["items"][0]["productId"], product["id"]);
    let number = order["orderNumber"].as_str().expect("order number");
    assert!(number.starts_with(ORDER_NUMBER_PREFIX));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_totals_with_adjustments() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("totals").await);

    let mut body = simple_order("100.00", 3);
    body["discount"] = json!("20.00");
    body["tax"] = json!("54.00");
    body["shipping"] = json!("50.00");

    let order = expect_data(
        owner.post(&format!("/stores/{store_id}/orders"), &body).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(order["subtotal"], "300.00");
    assert_eq!(order["total"], "384.00");

    body["discount"] = json!("1000.00");
    let resp = owner.post(&format!("/stores/{store_id}/orders"), &body).await;
    assert_eq!(
        expect_error(resp, StatusCode::BAD_REQUEST).await,
        "VALIDATION_ERROR"
    );

    let mut empty = simple_order("1.00", 1);
    empty["items"] = json!([]);
    let resp = owner.post(&format!("/stores/{store_id}/orders"), &empty).await;
    assert_eq!(
        expect_error(resp, StatusCode::BAD_REQUEST).await,
        "VALIDATION_ERROR"
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_foreign_references_are_not_found() {
    let owner = TestClient::register().await;
    let other = TestClient::register().await;
    let store_id = id_of(&owner.create_store("mine").await);
    let other_store = id_of(&other.create_store("theirs").await);

    let resp = other
        .post(
            &format!("/stores/{other_store}/products"),
            &json!({"title": "Yabancı", "price": "1.00"}),
        )
        .await;
    let foreign_product = expect_data(resp, StatusCode::CREATED).await;

    let mut body = simple_order("1.00", 1);
    body["items"][0]["productId"] = foreign_product["id"].clone();
    let resp = owner.post(&format!("/stores/{store_id}/orders"), &body).await;
    assert_eq!(
        expect_error(resp, StatusCode::NOT_FOUND).await,
        "PRODUCT_NOT_FOUND"
    );

    let mut body = simple_order("1.00", 1);
    body["customerId"] = json!(uuid::Uuid::new_v4());
    let resp = owner.post(&format!("/stores/{store_id}/orders"), &body).await;
    assert_eq!(
        expect_error(resp, StatusCode::NOT_FOUND).await,
        "CUSTOMER_NOT_FOUND"
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_status_axes_update_independently() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("status").await);

    let order = expect_data(
        owner
            .post(&format!("/stores/{store_id}/orders"), &simple_order("10.00", 1))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let order_id = id_of(&order);
    let path = format!("/stores/{store_id}/orders/{order_id}/status");

    let updated = expect_data(
        owner.patch(&path, &json!({"fulfillmentStatus": "FULFILLED"})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["fulfillmentStatus"], "FULFILLED");
    assert_eq!(updated["orderStatus"], "PENDING");
    assert_eq!(updated["paymentStatus"], "PENDING");
    assert_ne!(updated["updatedAt"], order["updatedAt"]);

    // Any transition is allowed
    let updated = expect_data(
        owner
            .patch(&path, &json!({"orderStatus": "DELIVERED", "paymentStatus": "REFUNDED"}))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["orderStatus"], "DELIVERED");
    assert_eq!(updated["fulfillmentStatus"], "FULFILLED");

    let resp = owner.patch(&path, &json!({})).await;
    assert_eq!(
        expect_error(resp, StatusCode::BAD_REQUEST).await,
        "VALIDATION_ERROR"
    );

    let resp = owner.patch(&path, &json!({"orderStatus": "LOST"})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_stale_expected_updated_at_conflicts() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("optimistic").await);

    let order = expect_data(
        owner
            .post(&format!("/stores/{store_id}/orders"), &simple_order("10.00", 1))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let path = format!("/stores/{store_id}/orders/{}/status", id_of(&order));
    let read_at = order["updatedAt"].clone();

    let resp = owner
        .patch(&path, &json!({"paymentStatus": "PAID", "expectedUpdatedAt": read_at}))
        .await;
    expect_data(resp, StatusCode::OK).await;

    let resp = owner
        .patch(&path, &json!({"paymentStatus": "FAILED", "expectedUpdatedAt": read_at}))
        .await;
    assert_eq!(expect_error(resp, StatusCode::CONFLICT).await, "CONFLICT");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_concurrent_orders_get_distinct_numbers() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("rush").await);
    let path = format!("/stores/{store_id}/orders");
    let body = simple_order("1.00", 1);

    let responses = join_all((0..100).map(|_| owner.post(&path, &body))).await;

    let mut numbers = HashSet::new();
    for resp in responses {
        let order = expect_data(resp, StatusCode::CREATED).await;
        numbers.insert(order["orderNumber"].as_str().expect("number").to_owned());
    }
    assert_eq!(numbers.len(), 100);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_order_reads_are_idempotent() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("reads").await);

    let order = expect_data(
        owner
            .post(&format!("/stores/{store_id}/orders"), &simple_order("12.50", 4))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let path = format!("/stores/{store_id}/orders/{}", id_of(&order));

    let first = expect_data(owner.get(&path).await, StatusCode::OK).await;
    let second = expect_data(owner.get(&path).await, StatusCode::OK).await;
    assert_eq!(first, second);
    assert_eq!(first["total"], "50.00");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_order_list_filters_by_status() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("filter").await);
    let base = format!("/stores/{store_id}/orders");

    for _ in 0..3 {
        owner.post(&base, &simple_order("5.00", 1)).await;
    }
    let order = expect_data(owner.post(&base, &simple_order("5.00", 1)).await, StatusCode::CREATED).await;
    owner
        .patch(
            &format!("{base}/{}/status", id_of(&order)),
            &json!({"orderStatus": "CANCELLED"}),
        )
        .await;

    let resp = owner.get(&format!("{base}?status=CANCELLED")).await;
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["itemCount"], 1);

    let resp = owner.get(&base).await;
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["meta"]["total"], 4);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_store_stats() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("stats").await);

    let mut product_ids = Vec::new();
    for title in ["Çok Satan", "Az Satan"] {
        let resp = owner
            .post(
                &format!("/stores/{store_id}/products"),
                &json!({"title": title, "price": "10.00", "status": "ACTIVE"}),
            )
            .await;
        product_ids.push(expect_data(resp, StatusCode::CREATED).await["id"].clone());
    }

    let mut body = simple_order("10.00", 5);
    body["items"][0]["productId"] = product_ids[0].clone();
    let paid = expect_data(
        owner.post(&format!("/stores/{store_id}/orders"), &body).await,
        StatusCode::CREATED,
    )
    .await;
    owner
        .patch(
            &format!("/stores/{store_id}/orders/{}/status", id_of(&paid)),
            &json!({"paymentStatus": "PAID"}),
        )
        .await;

    let mut body = simple_order("10.00", 1);
    body["items"][0]["productId"] = product_ids[1].clone();
    owner.post(&format!("/stores/{store_id}/orders"), &body).await;

    let stats = expect_data(
        owner.get(&format!("/stores/{store_id}/stats")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(stats["stats"]["totalSales"], "50.00");
    assert_eq!(stats["stats"]["totalOrders"], 2);
    assert_eq!(stats["stats"]["activeProducts"], 2);
    assert_eq!(stats["recentOrders"].as_array().map(Vec::len), Some(2));
    assert_eq!(stats["topProducts"][0]["id"], product_ids[0]);
    assert_eq!(stats["topProducts"][0]["quantitySold"], 5);
    assert_eq!(stats["topProducts"][1]["quantitySold"], 1);
}
