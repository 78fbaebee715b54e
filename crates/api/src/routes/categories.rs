//! Category tree CRUD.

use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use etic_core::{CategoryId, LocalizedText, StoreId};

use super::store_language;
use crate::db::CategoryRepository;
use crate::db::categories::{CategoryChanges, NewCategory};
use crate::error::{ApiError, Entity, missing};
use crate::extract::{ApiPath, ValidJson};
use crate::models::Message;
use crate::models::catalog::{Category, CategoryDetail, CategoryListItem};
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Staff, StoreAccess};
use crate::state::AppState;
use crate::validation::{self, double_option, normalize_slug, resolve_slug};

/// Category creation request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(custom(function = "validation::not_blank"))]
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    pub parent_id: Option<CategoryId>,
    #[serde(alias = "order")]
    pub position: Option<i32>,
    pub is_visible: Option<bool>,
}

/// Category update. Absent fields are untouched; `null` clears.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(custom(function = "validation::not_blank"))]
    pub name: Option<LocalizedText>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<LocalizedText>>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<CategoryId>>,
    #[serde(alias = "order")]
    pub position: Option<i32>,
    pub is_visible: Option<bool>,
}

/// Create a category.
///
/// `POST /api/v1/stores/{storeId}/categories`
pub async fn create(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidJson(body): ValidJson<CreateCategoryRequest>,
) -> ApiResult<Category> {
    let store_id = access.store_id();

    let language = store_language(state.pool(), store_id).await?;
    let slug = resolve_slug(body.slug.as_deref(), &body.name, &language)?;

    let category = CategoryRepository::new(state.pool())
        .create(
            store_id,
            NewCategory {
                name: body.name,
                description: body.description,
                slug,
                parent_id: body.parent_id,
                position: body.position.unwrap_or(0),
                is_visible: body.is_visible.unwrap_or(true),
            },
        )
        .await?;

    Ok(ApiResponse::created(category))
}

/// All categories with child and product counts.
///
/// `GET /api/v1/stores/{storeId}/categories`
pub async fn list(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
) -> ApiResult<Vec<CategoryListItem>> {
    let store_id = access.store_id();

    let categories = CategoryRepository::new(state.pool()).list(store_id).await?;
    Ok(ApiResponse::ok(categories))
}

/// Category detail with parent, children and products.
///
/// `GET /api/v1/stores/{storeId}/categories/{id}`
pub async fn show(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CategoryId)>,
) -> ApiResult<CategoryDetail> {
    let store_id = access.store_id();

    let categories = CategoryRepository::new(state.pool());
    let category = categories
        .get(store_id, id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Category))?;

    let parent = match category.parent_id {
        Some(parent_id) => categories.get_ref(store_id, parent_id).await?,
        None => None,
    };
    let children = categories.children(store_id, id).await?;
    let products = categories.products(store_id, id).await?;

    Ok(ApiResponse::ok(CategoryDetail {
        category,
        parent,
        children,
        products,
    }))
}

/// Update a category, including moving it in the tree.
///
/// `PATCH /api/v1/stores/{storeId}/categories/{id}`
pub async fn update(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CategoryId)>,
    ValidJson(body): ValidJson<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    let store_id = access.store_id();

    let changes = CategoryChanges {
        name: body.name,
        description: body.description,
        slug: body.slug.as_deref().map(normalize_slug).transpose()?,
        parent_id: body.parent_id,
        position: body.position,
        is_visible: body.is_visible,
    };

    let category = CategoryRepository::new(state.pool())
        .update(store_id, id, changes)
        .await
        .map_err(missing(Entity::Category))?;

    Ok(ApiResponse::ok(category))
}

/// Delete a category; its children move up to its parent.
///
/// `DELETE /api/v1/stores/{storeId}/categories/{id}`
pub async fn delete(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CategoryId)>,
) -> ApiResult<Message> {
    let store_id = access.store_id();

    CategoryRepository::new(state.pool())
        .delete(store_id, id)
        .await
        .map_err(missing(Entity::Category))?;

    Ok(ApiResponse::message("Category deleted successfully"))
}
