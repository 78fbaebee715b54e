//! Collection CRUD.

use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use etic_core::{CollectionId, LocalizedText, ProductId, StoreId};

use super::store_language;
use crate::db::{CollectionRepository, ProductRepository};
use crate::db::collections::NewCollection;
use crate::error::{ApiError, Entity, missing};
use crate::extract::{ApiPath, ValidJson};
use crate::models::Message;
use crate::models::catalog::{Collection, CollectionDetail, CollectionListItem};
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Staff, StoreAccess};
use crate::state::AppState;
use crate::validation::{self, dedup_ids, resolve_slug};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    #[validate(custom(function = "validation::not_blank"))]
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    /// Products to include, in display order.
    #[serde(default)]
    #[validate(length(max = 500))]
    pub product_ids: Vec<ProductId>,
}

/// `POST /api/v1/stores/{storeId}/collections`
pub async fn create(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidJson(body): ValidJson<CreateCollectionRequest>,
) -> ApiResult<Collection> {
    let store_id = access.store_id();

    let language = store_language(state.pool(), store_id).await?;
    let slug = resolve_slug(body.slug.as_deref(), &body.title, &language)?;

    let product_ids = dedup_ids(&body.product_ids);
    let unknown = ProductRepository::new(state.pool())
        .missing_ids(store_id, &product_ids)
        .await?;
    if !unknown.is_empty() {
        return Err(ApiError::NotFound(Entity::Product));
    }

    let collection = CollectionRepository::new(state.pool())
        .create(
            store_id,
            NewCollection {
                title: body.title,
                description: body.description,
                slug,
                product_ids,
            },
        )
        .await?;

    Ok(ApiResponse::created(collection))
}

/// `GET /api/v1/stores/{storeId}/collections`
pub async fn list(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
) -> ApiResult<Vec<CollectionListItem>> {
    let store_id = access.store_id();

    let collections = CollectionRepository::new(state.pool()).list(store_id).await?;
    Ok(ApiResponse::ok(collections))
}

/// `GET /api/v1/stores/{storeId}/collections/{id}`
pub async fn show(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CollectionId)>,
) -> ApiResult<CollectionDetail> {
    let store_id = access.store_id();

    let collections = CollectionRepository::new(state.pool());
    let collection = collections
        .get(store_id, id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Collection))?;
    let products = collections.products(store_id, id).await?;

    Ok(ApiResponse::ok(CollectionDetail {
        collection,
        products,
    }))
}

/// `DELETE /api/v1/stores/{storeId}/collections/{id}`
pub async fn delete(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CollectionId)>,
) -> ApiResult<Message> {
    let store_id = access.store_id();

    CollectionRepository::new(state.pool())
        .delete(store_id, id)
        .await
        .map_err(missing(Entity::Collection))?;

    Ok(ApiResponse::message("Collection deleted successfully"))
}
