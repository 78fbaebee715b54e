//! Store tenancy and membership tests.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (cargo run -p etic-cli -- migrate)
//! - The API server running (cargo run -p etic-api)
//!
//! Run with: cargo test -p etic-integration-tests -- --ignored

use etic_integration_tests::{TestClient, expect_data, expect_error, id_of};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_creator_becomes_owner() {
    let owner = TestClient::register().await;
    let store = owner.create_store("owned").await;
    let store_id = id_of(&store);

    let stores = expect_data(owner.get("/stores").await, StatusCode::OK).await;
    let listed = stores
        .as_array()
        .expect("stores array")
        .iter()
        .find(|s| s["id"] == store["id"])
        .expect("new store listed");
    assert_eq!(listed["role"], "OWNER");
    assert_eq!(listed["counts"]["products"], 0);

    let detail = expect_data(owner.get(&format!("/stores/{store_id}")).await, StatusCode::OK).await;
    assert_eq!(detail["members"].as_array().map(Vec::len), Some(1));
    assert_eq!(detail["defaultCurrency"], "TRY");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_slug_conflicts() {
    let owner = TestClient::register().await;
    let store = owner.create_store("dup").await;

    let resp = owner
        .post("/stores", &json!({"name": "Again", "slug": store["slug"]}))
        .await;
    assert_eq!(expect_error(resp, StatusCode::CONFLICT).await, "CONFLICT");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_non_members_are_forbidden() {
    let owner = TestClient::register().await;
    let outsider = TestClient::register().await;
    let store_id = id_of(&owner.create_store("private").await);

    for path in [
        format!("/stores/{store_id}"),
        format!("/stores/{store_id}/products"),
        format!("/stores/{store_id}/orders"),
        format!("/stores/{store_id}/customers"),
        format!("/stores/{store_id}/stats"),
    ] {
        let resp = outsider.get(&path).await;
        assert_eq!(expect_error(resp, StatusCode::FORBIDDEN).await, "FORBIDDEN", "{path}");
    }

    let resp = outsider.delete(&format!("/stores/{store_id}")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_outsiders_are_forbidden_before_body_checks() {
    let owner = TestClient::register().await;
    let outsider = TestClient::register().await;
    let store_id = id_of(&owner.create_store("sealed").await);

    let cases = [
        (format!("/stores/{store_id}/orders"), json!({"email": "x", "items": []})),
        (format!("/stores/{store_id}/products"), json!({"title": "", "price": "0"})),
        (format!("/stores/{store_id}/customers"), json!({"email": 42})),
        (format!("/stores/{store_id}/collections"), json!({})),
        (format!("/stores/{store_id}/members"), json!({"email": "nobody", "role": "KING"})),
    ];
    for (path, body) in &cases {
        let resp = outsider.post(path, body).await;
        assert_eq!(expect_error(resp, StatusCode::FORBIDDEN).await, "FORBIDDEN", "{path}");
    }

    // Members below the required role are refused the same way
    let resp = owner
        .post(
            &format!("/stores/{store_id}/members"),
            &json!({"email": outsider.email, "role": "STAFF"}),
        )
        .await;
    expect_data(resp, StatusCode::CREATED).await;
    let resp = outsider
        .patch(&format!("/stores/{store_id}"), &json!({"name": ""}))
        .await;
    assert_eq!(expect_error(resp, StatusCode::FORBIDDEN).await, "FORBIDDEN");

    // Once the caller is allowed in, the body is checked
    let resp = outsider
        .post(&format!("/stores/{store_id}/products"), &json!({"title": "", "price": "0"}))
        .await;
    assert_eq!(
        expect_error(resp, StatusCode::BAD_REQUEST).await,
        "VALIDATION_ERROR"
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_only_owner_deletes_store() {
    let owner = TestClient::register().await;
    let staff = TestClient::register().await;
    let store_id = id_of(&owner.create_store("delete").await);

    let resp = owner
        .post(
            &format!("/stores/{store_id}/members"),
            &json!({"email": staff.email, "role": "STAFF"}),
        )
        .await;
    expect_data(resp, StatusCode::CREATED).await;

    // Staff can read but not administer
    assert_eq!(staff.get(&format!("/stores/{store_id}")).await.status(), StatusCode::OK);
    let resp = staff
        .patch(&format!("/stores/{store_id}"), &json!({"name": "Renamed"}))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = staff.delete(&format!("/stores/{store_id}")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = owner.delete(&format!("/stores/{store_id}")).await;
    expect_data(resp, StatusCode::OK).await;
    let resp = owner.get(&format!("/stores/{store_id}")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_unknown_member_email() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("members").await);

    let resp = owner
        .post(
            &format!("/stores/{store_id}/members"),
            &json!({"email": "nobody-here@example.com", "role": "STAFF"}),
        )
        .await;
    assert_eq!(expect_error(resp, StatusCode::NOT_FOUND).await, "USER_NOT_FOUND");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_last_owner_is_protected() {
    let owner = TestClient::register().await;
    let admin = TestClient::register().await;
    let store_id = id_of(&owner.create_store("owners").await);

    let me = expect_data(owner.get("/auth/me").await, StatusCode::OK).await;
    let owner_id = id_of(&me);

    // The sole owner can neither leave nor step down
    let resp = owner
        .delete(&format!("/stores/{store_id}/members/{owner_id}"))
        .await;
    assert_eq!(expect_error(resp, StatusCode::CONFLICT).await, "CONFLICT");
    let resp = owner
        .patch(
            &format!("/stores/{store_id}/members/{owner_id}"),
            &json!({"role": "ADMIN"}),
        )
        .await;
    assert_eq!(expect_error(resp, StatusCode::CONFLICT).await, "CONFLICT");

    // An admin cannot touch owners
    let resp = owner
        .post(
            &format!("/stores/{store_id}/members"),
            &json!({"email": admin.email, "role": "ADMIN"}),
        )
        .await;
    expect_data(resp, StatusCode::CREATED).await;
    let resp = admin
        .delete(&format!("/stores/{store_id}/members/{owner_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // With a second owner the first may step down
    let admin_me = expect_data(admin.get("/auth/me").await, StatusCode::OK).await;
    let admin_id = id_of(&admin_me);
    let resp = owner
        .patch(
            &format!("/stores/{store_id}/members/{admin_id}"),
            &json!({"role": "OWNER"}),
        )
        .await;
    expect_data(resp, StatusCode::OK).await;
    let resp = owner
        .patch(
            &format!("/stores/{store_id}/members/{owner_id}"),
            &json!({"role": "STAFF"}),
        )
        .await;
    expect_data(resp, StatusCode::OK).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_login_round_trip() {
    let user = TestClient::register().await;

    let resp = user
        .client
        .post(format!("{}/api/v1/auth/login", user.base_url))
        .json(&json!({"email": user.email, "password": "correct-horse-battery"}))
        .send()
        .await
        .expect("login failed");
    let session = expect_data(resp, StatusCode::OK).await;
    assert!(session["token"].as_str().is_some());
    assert!(session["user"]["lastLoginAt"].is_string());

    let resp = user
        .client
        .post(format!("{}/api/v1/auth/login", user.base_url))
        .json(&json!({"email": user.email, "password": "wrong-password"}))
        .send()
        .await
        .expect("login failed");
    assert_eq!(
        expect_error(resp, StatusCode::UNAUTHORIZED).await,
        "INVALID_CREDENTIALS"
    );
}
