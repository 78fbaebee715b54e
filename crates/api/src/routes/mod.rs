//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness check
//! GET  /health/ready                             - Readiness check (database)
//!
//! # Auth
//! POST /api/v1/auth/register                     - Create account, returns token
//! POST /api/v1/auth/login                        - Exchange credentials for token
//! GET  /api/v1/auth/me                           - Current user with memberships
//!
//! # Stores
//! GET    /api/v1/stores                          - Caller's stores with counts
//! POST   /api/v1/stores                          - Create store (caller becomes OWNER)
//! GET    /api/v1/stores/{storeId}                - Store detail with members
//! PATCH  /api/v1/stores/{storeId}                - Update store (ADMIN)
//! DELETE /api/v1/stores/{storeId}                - Delete store (OWNER)
//!
//! # Members
//! GET    /api/v1/stores/{storeId}/members        - List members
//! POST   /api/v1/stores/{storeId}/members        - Add member by email (ADMIN)
//! PATCH  /api/v1/stores/{storeId}/members/{userId}  - Change role (ADMIN)
//! DELETE /api/v1/stores/{storeId}/members/{userId}  - Remove member (ADMIN)
//!
//! # Catalog
//! GET|POST         /api/v1/stores/{storeId}/categories
//! GET|PATCH|DELETE /api/v1/stores/{storeId}/categories/{id}
//! GET|POST         /api/v1/stores/{storeId}/products
//! GET|PATCH|DELETE /api/v1/stores/{storeId}/products/{id}
//! GET|POST         /api/v1/stores/{storeId}/collections
//! GET|DELETE       /api/v1/stores/{storeId}/collections/{id}
//!
//! # Customers
//! GET|POST   /api/v1/stores/{storeId}/customers
//! GET|PATCH  /api/v1/stores/{storeId}/customers/{id}
//! POST       /api/v1/stores/{storeId}/customers/{id}/addresses
//! DELETE     /api/v1/stores/{storeId}/customers/{id}/addresses/{addressId}
//!
//! # Orders
//! GET|POST   /api/v1/stores/{storeId}/orders
//! GET        /api/v1/stores/{storeId}/orders/{id}
//! PATCH      /api/v1/stores/{storeId}/orders/{id}/status
//!
//! # Reports
//! GET        /api/v1/stores/{storeId}/stats
//! ```
//!
//! Every store route requires a bearer token and a membership in the store.

pub mod auth;
pub mod categories;
pub mod collections;
pub mod customers;
pub mod members;
pub mod orders;
pub mod products;
pub mod stats;
pub mod stores;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use sqlx::PgPool;

use etic_core::StoreId;

use crate::db::StoreRepository;
use crate::error::{ApiError, Entity};
use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/v1", v1())
        .fallback(fallback)
}

fn v1() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Stores
        .route("/stores", get(stores::list).post(stores::create))
        .route(
            "/stores/{storeId}",
            get(stores::show)
                .patch(stores::update)
                .delete(stores::delete),
        )
        // Members
        .route(
            "/stores/{storeId}/members",
            get(members::list).post(members::add),
        )
        .route(
            "/stores/{storeId}/members/{userId}",
            patch(members::update).delete(members::remove),
        )
        // Categories
        .route(
            "/stores/{storeId}/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/stores/{storeId}/categories/{id}",
            get(categories::show)
                .patch(categories::update)
                .delete(categories::delete),
        )
        // Products
        .route(
            "/stores/{storeId}/products",
            get(products::list).post(products::create),
        )
        .route(
            "/stores/{storeId}/products/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
        // Collections
        .route(
            "/stores/{storeId}/collections",
            get(collections::list).post(collections::create),
        )
        .route(
            "/stores/{storeId}/collections/{id}",
            get(collections::show).delete(collections::delete),
        )
        // Customers
        .route(
            "/stores/{storeId}/customers",
            get(customers::list).post(customers::create),
        )
        .route(
            "/stores/{storeId}/customers/{id}",
            get(customers::show).patch(customers::update),
        )
        .route(
            "/stores/{storeId}/customers/{id}/addresses",
            post(customers::add_address),
        )
        .route(
            "/stores/{storeId}/customers/{id}/addresses/{addressId}",
            axum::routing::delete(customers::delete_address),
        )
        // Orders
        .route(
            "/stores/{storeId}/orders",
            get(orders::list).post(orders::create),
        )
        .route("/stores/{storeId}/orders/{id}", get(orders::show))
        .route(
            "/stores/{storeId}/orders/{id}/status",
            patch(orders::update_status),
        )
        // Reports
        .route("/stores/{storeId}/stats", get(stats::show))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn fallback() -> ApiError {
    ApiError::RouteNotFound
}

/// The store's default language, used to derive slugs from localized text.
pub(crate) async fn store_language(pool: &PgPool, store: StoreId) -> Result<String, ApiError> {
    StoreRepository::new(pool)
        .get(store)
        .await?
        .map(|s| s.default_language)
        .ok_or(ApiError::NotFound(Entity::Store))
}
