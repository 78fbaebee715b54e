//! Store creation, listing, settings and deletion.

use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use etic_core::CurrencyCode;

use crate::db::StoreRepository;
use crate::db::stores::{NewStore, StoreChanges};
use crate::error::{ApiError, Entity, missing};
use crate::extract::ValidJson;
use crate::middleware::AuthUser;
use crate::models::Message;
use crate::models::store::{Store, StoreDetail, StoreSummary};
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Admin, Owner, Staff, StoreAccess};
use crate::state::AppState;
use crate::validation::{self, double_option};

/// Store creation request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(custom(function = "validation::store_slug"), length(max = 63))]
    pub slug: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom(function = "validation::email"))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub default_currency: Option<CurrencyCode>,
    #[validate(length(min = 2, max = 5))]
    pub default_language: Option<String>,
}

/// Store settings update. Absent fields are untouched; `null` clears.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoreRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 2000))]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(custom(function = "validation::email"))]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 30))]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 200))]
    pub company_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 50))]
    pub tax_number: Option<Option<String>>,
    pub default_currency: Option<CurrencyCode>,
    #[validate(length(min = 2, max = 5))]
    pub default_language: Option<String>,
}

/// Normalize an optional contact email to its canonical form.
fn normalize_email(email: Option<String>) -> Result<Option<String>, ApiError> {
    email
        .map(|e| validation::parse_email(&e, "email").map(etic_core::Email::into_inner))
        .transpose()
}

/// Create a store owned by the caller.
///
/// `POST /api/v1/stores`
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<CreateStoreRequest>,
) -> ApiResult<Store> {
    let store = NewStore {
        slug: body.slug,
        name: body.name.trim().to_owned(),
        description: body.description,
        email: normalize_email(body.email)?,
        phone: body.phone,
        default_currency: body.default_currency.unwrap_or_default(),
        default_language: body
            .default_language
            .unwrap_or_else(|| etic_core::types::localized::PRIMARY_LANGUAGE.to_owned()),
    };

    let store = StoreRepository::new(state.pool())
        .create(user.id, store)
        .await?;

    tracing::info!(store_id = %store.id, user_id = %user.id, "Store created");
    Ok(ApiResponse::created(store))
}

/// Stores the caller belongs to.
///
/// `GET /api/v1/stores`
pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<StoreSummary>> {
    let stores = StoreRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(ApiResponse::ok(stores))
}

/// Store detail with members and counts.
///
/// `GET /api/v1/stores/{storeId}`
pub async fn show(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
) -> ApiResult<StoreDetail> {
    let store_id = access.store_id();

    let stores = StoreRepository::new(state.pool());
    let store = stores
        .get(store_id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Store))?;
    let members = stores.members(store_id).await?;
    let counts = stores.counts(store_id).await.map_err(missing(Entity::Store))?;

    Ok(ApiResponse::ok(StoreDetail {
        store,
        members,
        counts,
    }))
}

/// Update store settings.
///
/// `PATCH /api/v1/stores/{storeId}`
pub async fn update(
    State(state): State<AppState>,
    access: StoreAccess<Admin>,
    ValidJson(body): ValidJson<UpdateStoreRequest>,
) -> ApiResult<Store> {
    let store_id = access.store_id();

    let changes = StoreChanges {
        name: body.name.map(|n| n.trim().to_owned()),
        description: body.description,
        email: body.email.map(normalize_email).transpose()?,
        phone: body.phone,
        company_name: body.company_name,
        tax_number: body.tax_number,
        default_currency: body.default_currency,
        default_language: body.default_language,
    };

    let store = StoreRepository::new(state.pool())
        .update(store_id, changes)
        .await
        .map_err(missing(Entity::Store))?;

    Ok(ApiResponse::ok(store))
}

/// Delete a store and all of its data.
///
/// `DELETE /api/v1/stores/{storeId}`
pub async fn delete(
    State(state): State<AppState>,
    access: StoreAccess<Owner>,
) -> ApiResult<Message> {
    let store_id = access.store_id();

    StoreRepository::new(state.pool())
        .delete(store_id)
        .await
        .map_err(missing(Entity::Store))?;

    tracing::info!(store_id = %store_id, user_id = %access.user.id, "Store deleted");
    Ok(ApiResponse::message("Store deleted successfully"))
}
