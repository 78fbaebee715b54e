//! Customer and address book tests.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (cargo run -p etic-cli -- migrate)
//! - The API server running (cargo run -p etic-api)
//!
//! Run with: cargo test -p etic-integration-tests -- --ignored

use etic_integration_tests::{TestClient, address, expect_data, expect_error, id_of};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn defaults(addresses: &Value) -> Vec<String> {
    addresses
        .as_array()
        .expect("addresses")
        .iter()
        .filter(|a| a["isDefault"] == true)
        .map(id_of)
        .collect()
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_single_default_address() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("addresses").await);

    let customer = expect_data(
        owner
            .post(
                &format!("/stores/{store_id}/customers"),
                &json!({"email": "Ayse@Example.com", "firstName": "Ayşe", "tags": ["vip", "vip"]}),
            )
            .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(customer["tags"], json!(["vip"]));
    let customer_path = format!("/stores/{store_id}/customers/{}", id_of(&customer));
    let addresses_path = format!("{customer_path}/addresses");

    // First address becomes the default even when not asked
    let first = expect_data(owner.post(&addresses_path, &address()).await, StatusCode::CREATED).await;
    assert_eq!(first["isDefault"], true);

    let second = expect_data(owner.post(&addresses_path, &address()).await, StatusCode::CREATED).await;
    assert_eq!(second["isDefault"], false);

    let mut third_body = address();
    third_body["isDefault"] = json!(true);
    let third = expect_data(owner.post(&addresses_path, &third_body).await, StatusCode::CREATED).await;

    let detail = expect_data(owner.get(&customer_path).await, StatusCode::OK).await;
    assert_eq!(defaults(&detail["addresses"]), vec![id_of(&third)]);

    // Removing the default promotes another address
    let resp = owner.delete(&format!("{addresses_path}/{}", id_of(&third))).await;
    expect_data(resp, StatusCode::OK).await;
    let detail = expect_data(owner.get(&customer_path).await, StatusCode::OK).await;
    assert_eq!(detail["addresses"].as_array().map(Vec::len), Some(2));
    assert_eq!(defaults(&detail["addresses"]).len(), 1);

    let resp = owner.delete(&format!("{addresses_path}/{}", id_of(&third))).await;
    assert_eq!(
        expect_error(resp, StatusCode::NOT_FOUND).await,
        "ADDRESS_NOT_FOUND"
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_customer_email_unique_per_store() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("unique").await);
    let other_store = id_of(&owner.create_store("unique-other").await);
    let body = json!({"email": "same@example.com"});

    expect_data(
        owner.post(&format!("/stores/{store_id}/customers"), &body).await,
        StatusCode::CREATED,
    )
    .await;
    let resp = owner.post(&format!("/stores/{store_id}/customers"), &body).await;
    assert_eq!(expect_error(resp, StatusCode::CONFLICT).await, "CONFLICT");

    // A different store is a different namespace
    expect_data(
        owner.post(&format!("/stores/{other_store}/customers"), &body).await,
        StatusCode::CREATED,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_customer_search_and_update() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("search").await);
    let base = format!("/stores/{store_id}/customers");

    for (email, first) in [("mehmet@example.com", "Mehmet"), ("zeynep@example.com", "Zeynep")] {
        owner
            .post(&base, &json!({"email": email, "firstName": first}))
            .await;
    }

    let resp = owner.get(&format!("{base}?search=zeyn")).await;
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["meta"]["total"], 1);
    let zeynep = body["data"][0].clone();
    assert_eq!(zeynep["orderCount"], 0);

    let updated = expect_data(
        owner
            .patch(
                &format!("{base}/{}", id_of(&zeynep)),
                &json!({"firstName": null, "note": "Sadık müşteri"}),
            )
            .await,
        StatusCode::OK,
    )
    .await;
    assert!(updated["firstName"].is_null());
    assert_eq!(updated["note"], "Sadık müşteri");
    assert_eq!(updated["email"], "zeynep@example.com");
}
