//! Catalog tests: categories, products, collections.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (cargo run -p etic-cli -- migrate)
//! - The API server running (cargo run -p etic-api)
//!
//! Run with: cargo test -p etic-integration-tests -- --ignored

use etic_integration_tests::{TestClient, expect_data, expect_error, id_of};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_category_and_product_flow() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("demo-store").await);

    let resp = owner
        .post(
            &format!("/stores/{store_id}/categories"),
            &json!({"name": {"tr": "Elektronik", "en": "Electronics"}}),
        )
        .await;
    let category = expect_data(resp, StatusCode::CREATED).await;
    assert_eq!(category["slug"], "elektronik");
    let category_id = id_of(&category);

    let resp = owner
        .post(
            &format!("/stores/{store_id}/products"),
            &json!({
                "title": {"tr": "Akıllı Telefon", "en": "Smartphone"},
                "price": "45000.00",
                "compareAtPrice": "50000.00",
                "quantity": 50,
                "status": "ACTIVE",
                "categoryIds": [category_id, category_id]
            }),
        )
        .await;
    let product = expect_data(resp, StatusCode::CREATED).await;
    assert_eq!(product["slug"], "akilli-telefon");
    assert_eq!(product["price"], "45000.00");
    assert_eq!(product["compareAtPrice"], "50000.00");
    assert_eq!(product["quantity"], 50);
    let product_id = id_of(&product);

    let detail = expect_data(
        owner
            .get(&format!("/stores/{store_id}/products/{product_id}"))
            .await,
        StatusCode::OK,
    )
    .await;
    let categories = detail["categories"].as_array().expect("categories");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["slug"], "elektronik");

    let listed = expect_data(
        owner.get(&format!("/stores/{store_id}/categories")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(listed[0]["productCount"], 1);

    // Same slug again is a conflict
    let resp = owner
        .post(
            &format!("/stores/{store_id}/products"),
            &json!({"title": "Akıllı Telefon", "price": "1.00"}),
        )
        .await;
    assert_eq!(expect_error(resp, StatusCode::CONFLICT).await, "CONFLICT");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_validation() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("validate").await);

    let resp = owner
        .post(
            &format!("/stores/{store_id}/products"),
            &json!({"title": "Bedava", "price": "0"}),
        )
        .await;
    assert_eq!(
        expect_error(resp, StatusCode::BAD_REQUEST).await,
        "VALIDATION_ERROR"
    );

    let resp = owner
        .post(
            &format!("/stores/{store_id}/products"),
            &json!({"title": "Kayıp", "price": "10", "categoryIds": [uuid::Uuid::new_v4()]}),
        )
        .await;
    assert_eq!(
        expect_error(resp, StatusCode::NOT_FOUND).await,
        "CATEGORY_NOT_FOUND"
    );
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_pagination() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("paging").await);

    for n in 0..45 {
        let resp = owner
            .post(
                &format!("/stores/{store_id}/products"),
                &json!({"title": format!("Product {n}"), "price": "10.00"}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = owner
        .get(&format!("/stores/{store_id}/products?page=2&limit=20"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(20));
    assert_eq!(body["meta"]["page"], 2);
    assert_eq!(body["meta"]["limit"], 20);
    assert_eq!(body["meta"]["total"], 45);
    assert_eq!(body["meta"]["totalPages"], 3);

    let resp = owner
        .get(&format!("/stores/{store_id}/products?page=3&limit=20"))
        .await;
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(5));

    let resp = owner
        .get(&format!("/stores/{store_id}/products?search=product-4"))
        .await;
    let body: serde_json::Value = resp.json().await.expect("json");
    // product-4 and product-40..44
    assert_eq!(body["meta"]["total"], 6);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_category_cycle_is_rejected() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("tree").await);
    let base = format!("/stores/{store_id}/categories");

    let root = id_of(&expect_data(owner.post(&base, &json!({"name": "Kök"})).await, StatusCode::CREATED).await);
    let child = id_of(
        &expect_data(
            owner.post(&base, &json!({"name": "Çocuk", "parentId": root})).await,
            StatusCode::CREATED,
        )
        .await,
    );
    let grandchild = id_of(
        &expect_data(
            owner.post(&base, &json!({"name": "Torun", "parentId": child})).await,
            StatusCode::CREATED,
        )
        .await,
    );

    for parent in [&root, &grandchild] {
        let resp = owner
            .patch(&format!("{base}/{root}"), &json!({"parentId": parent}))
            .await;
        assert_eq!(
            expect_error(resp, StatusCode::BAD_REQUEST).await,
            "VALIDATION_ERROR"
        );
    }

    // Deleting the middle node re-parents its child to the root
    expect_data(owner.delete(&format!("{base}/{child}")).await, StatusCode::OK).await;
    let moved = expect_data(owner.get(&format!("{base}/{grandchild}")).await, StatusCode::OK).await;
    assert_eq!(moved["parentId"], root.as_str());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_collection_keeps_product_order() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("collections").await);
    let collections = format!("/stores/{store_id}/collections");

    let resp = owner
        .post(
            &collections,
            &json!({"title": {"tr": "Yaz İndirimi", "en": "Summer Sale"}}),
        )
        .await;
    let summer = expect_data(resp, StatusCode::CREATED).await;
    assert_eq!(summer["slug"], "yaz-indirimi");
    let summer_id = id_of(&summer);

    let resp = owner.post(&collections, &json!({"title": "Yeni Sezon"})).await;
    let season_id = id_of(&expect_data(resp, StatusCode::CREATED).await);

    // The first product joins both collections, the second only the summer one
    let mut product_ids = Vec::new();
    for (title, links) in [
        ("Birinci", json!([season_id, summer_id])),
        ("İkinci", json!([summer_id])),
    ] {
        let resp = owner
            .post(
                &format!("/stores/{store_id}/products"),
                &json!({"title": title, "price": "5.00", "collectionIds": links}),
            )
            .await;
        product_ids.push(id_of(&expect_data(resp, StatusCode::CREATED).await));
    }
    let [first, second]: [String; 2] = product_ids.try_into().expect("two products");

    let slugs = |detail: &Value| -> Vec<String> {
        detail["products"]
            .as_array()
            .map(|products| {
                products
                    .iter()
                    .filter_map(|p| p["slug"].as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    };

    let detail = expect_data(
        owner.get(&format!("{collections}/{summer_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(slugs(&detail), ["birinci", "ikinci"]);

    // Re-saving the links keeps the existing position
    let resp = owner
        .patch(
            &format!("/stores/{store_id}/products/{first}"),
            &json!({"collectionIds": [summer_id]}),
        )
        .await;
    expect_data(resp, StatusCode::OK).await;
    let detail = expect_data(
        owner.get(&format!("{collections}/{summer_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(slugs(&detail), ["birinci", "ikinci"]);

    // A collection created with explicit members lists them in request order
    let resp = owner
        .post(
            &collections,
            &json!({"title": "Öne Çıkanlar", "productIds": [second, first]}),
        )
        .await;
    let featured_id = id_of(&expect_data(resp, StatusCode::CREATED).await);
    let detail = expect_data(
        owner.get(&format!("{collections}/{featured_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(slugs(&detail), ["ikinci", "birinci"]);

    let resp = owner.delete(&format!("{collections}/{summer_id}")).await;
    expect_data(resp, StatusCode::OK).await;

    // Products survive their collection
    for id in [first, second] {
        let resp = owner.get(&format!("/stores/{store_id}/products/{id}")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_collection_rejects_foreign_products() {
    let owner = TestClient::register().await;
    let store_id = id_of(&owner.create_store("collections-own").await);
    let other_id = id_of(&owner.create_store("collections-other").await);

    let resp = owner
        .post(
            &format!("/stores/{other_id}/products"),
            &json!({"title": "Yabancı", "price": "5.00"}),
        )
        .await;
    let foreign = id_of(&expect_data(resp, StatusCode::CREATED).await);

    let resp = owner
        .post(
            &format!("/stores/{store_id}/collections"),
            &json!({"title": "Karışık", "productIds": [foreign]}),
        )
        .await;
    assert_eq!(
        expect_error(resp, StatusCode::NOT_FOUND).await,
        "PRODUCT_NOT_FOUND"
    );
}
