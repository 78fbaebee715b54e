//! Integration test support for the ETIC API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and start the API against a scratch database
//! cargo run -p etic-cli -- migrate
//! cargo run -p etic-api
//!
//! # Run the ignored HTTP tests
//! cargo test -p etic-integration-tests -- --ignored
//! ```
//!
//! Every test registers its own user and store, so tests can run in
//! parallel against one server.

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the API under test (`API_BASE_URL`, default port 3001).
#[must_use]
pub fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A short random suffix for unique emails and slugs.
#[must_use]
pub fn unique() -> String {
    Uuid::new_v4().simple().to_string().chars().take(12).collect()
}

/// An authenticated API client.
#[derive(Clone)]
pub struct TestClient {
    pub client: Client,
    pub base_url: String,
    pub token: String,
    pub email: String,
}

impl TestClient {
    /// Register a fresh user and keep its token.
    ///
    /// # Panics
    ///
    /// Panics if the server is unreachable or registration fails.
    pub async fn register() -> Self {
        let client = Client::new();
        let base_url = base_url();
        let email = format!("user-{}@example.com", unique());

        let resp = client
            .post(format!("{base_url}/api/v1/auth/register"))
            .json(&json!({"email": email, "password": "correct-horse-battery", "name": "Test User"}))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = resp.json().await.expect("Failed to parse register response");
        let token = body["data"]["token"]
            .as_str()
            .expect("token missing")
            .to_owned();

        Self {
            client,
            base_url,
            token,
            email,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// `GET` with the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .expect("GET failed")
    }

    /// `POST` a JSON body with the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .expect("POST failed")
    }

    /// `PATCH` a JSON body with the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn patch(&self, path: &str, body: &Value) -> Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .expect("PATCH failed")
    }

    /// `DELETE` with the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .expect("DELETE failed")
    }

    /// Create a store with a unique slug and return its JSON.
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn create_store(&self, prefix: &str) -> Value {
        let slug = format!("{prefix}-{}", unique());
        let resp = self
            .post("/stores", &json!({"name": "Test Store", "slug": slug}))
            .await;
        expect_data(resp, StatusCode::CREATED).await
    }
}

/// Assert the status and return the `data` field of a success envelope.
///
/// # Panics
///
/// Panics if the status differs or the body is not a success envelope.
pub async fn expect_data(resp: Response, status: StatusCode) -> Value {
    let actual = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse response body");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    assert_eq!(body["success"], true, "body: {body}");
    body["data"].clone()
}

/// Assert the status and return the `error.code` of an error envelope.
///
/// # Panics
///
/// Panics if the status differs or the body is not an error envelope.
pub async fn expect_error(resp: Response, status: StatusCode) -> String {
    let actual = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse response body");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    assert_eq!(body["success"], false, "body: {body}");
    body["error"]["code"]
        .as_str()
        .expect("error code missing")
        .to_owned()
}

/// A minimal valid address snapshot.
#[must_use]
pub fn address() -> Value {
    json!({
        "firstName": "Ayşe",
        "lastName": "Yılmaz",
        "address1": "Bağdat Caddesi No: 123",
        "city": "İstanbul",
        "zip": "34710",
        "country": "TR"
    })
}

/// An order body with one ad-hoc line.
#[must_use]
pub fn simple_order(price: &str, quantity: u32) -> Value {
    json!({
        "email": "buyer@example.com",
        "billingAddress": address(),
        "shippingAddress": address(),
        "items": [{"title": "Ürün", "quantity": quantity, "price": price}]
    })
}

/// The `id` of a JSON entity as an owned string.
///
/// # Panics
///
/// Panics if the value has no string `id`.
#[must_use]
pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id missing").to_owned()
}
