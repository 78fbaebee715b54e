//! Product CRUD.

use axum::extract::State;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use etic_core::{
    CategoryId, CollectionId, LocalizedText, PageRequest, ProductId, ProductStatus, StoreId,
    round_money,
};

use super::store_language;
use crate::db::products::{NewProduct, ProductChanges, ProductFilter};
use crate::db::{CategoryRepository, CollectionRepository, ProductRepository};
use crate::error::{ApiError, Entity, missing};
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::models::Message;
use crate::models::catalog::{Product, ProductDetail};
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Staff, StoreAccess};
use crate::state::AppState;
use crate::validation::{self, dedup_ids, double_option, normalize_slug, resolve_slug};

/// Product list query string.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[validate(length(max = 200))]
    pub search: Option<String>,
    pub status: Option<ProductStatus>,
    pub featured: Option<bool>,
}

/// Product creation request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(custom(function = "validation::not_blank"))]
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    #[validate(custom(function = "validation::positive_money"))]
    pub price: Decimal,
    #[validate(custom(function = "validation::positive_money"))]
    pub compare_at_price: Option<Decimal>,
    #[validate(length(max = 100))]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub barcode: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    pub track_inventory: Option<bool>,
    pub status: Option<ProductStatus>,
    pub featured: Option<bool>,
    #[validate(length(max = 200))]
    pub seo_title: Option<String>,
    #[validate(length(max = 500))]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub collection_ids: Vec<CollectionId>,
}

/// Product update. Absent fields are untouched; `null` clears.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(custom(function = "validation::not_blank"))]
    pub title: Option<LocalizedText>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<LocalizedText>>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    #[validate(custom(function = "validation::positive_money"))]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(custom(function = "validation::positive_money"))]
    pub compare_at_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    pub sku: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    pub barcode: Option<Option<String>>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    pub track_inventory: Option<bool>,
    pub status: Option<ProductStatus>,
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 200))]
    pub seo_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500))]
    pub seo_description: Option<Option<String>>,
    pub category_ids: Option<Vec<CategoryId>>,
    pub collection_ids: Option<Vec<CollectionId>>,
}

/// Deduplicate link IDs and confirm they all belong to the store.
async fn check_links(
    state: &AppState,
    store_id: StoreId,
    category_ids: Option<&[CategoryId]>,
    collection_ids: Option<&[CollectionId]>,
) -> Result<(Option<Vec<CategoryId>>, Option<Vec<CollectionId>>), ApiError> {
    let categories = category_ids.map(dedup_ids);
    let collections = collection_ids.map(dedup_ids);

    if let Some(ids) = &categories {
        let unknown = CategoryRepository::new(state.pool())
            .missing_ids(store_id, ids)
            .await?;
        if !unknown.is_empty() {
            return Err(ApiError::NotFound(Entity::Category));
        }
    }
    if let Some(ids) = &collections {
        let unknown = CollectionRepository::new(state.pool())
            .missing_ids(store_id, ids)
            .await?;
        if !unknown.is_empty() {
            return Err(ApiError::NotFound(Entity::Collection));
        }
    }

    Ok((categories, collections))
}

/// Create a product.
///
/// `POST /api/v1/stores/{storeId}/products`
pub async fn create(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidJson(body): ValidJson<CreateProductRequest>,
) -> ApiResult<Product> {
    let store_id = access.store_id();

    let language = store_language(state.pool(), store_id).await?;
    let slug = resolve_slug(body.slug.as_deref(), &body.title, &language)?;
    let (category_ids, collection_ids) = check_links(
        &state,
        store_id,
        Some(body.category_ids.as_slice()),
        Some(body.collection_ids.as_slice()),
    )
    .await?;

    let product = ProductRepository::new(state.pool())
        .create(
            store_id,
            NewProduct {
                title: body.title,
                description: body.description,
                slug,
                price: round_money(body.price),
                compare_at_price: body.compare_at_price.map(round_money),
                sku: body.sku,
                barcode: body.barcode,
                quantity: body.quantity.unwrap_or(0),
                track_inventory: body.track_inventory.unwrap_or(true),
                status: body.status.unwrap_or_default(),
                featured: body.featured.unwrap_or(false),
                seo_title: body.seo_title,
                seo_description: body.seo_description,
                category_ids: category_ids.unwrap_or_default(),
                collection_ids: collection_ids.unwrap_or_default(),
            },
        )
        .await?;

    Ok(ApiResponse::created(product))
}

/// A page of products.
///
/// `GET /api/v1/stores/{storeId}/products`
pub async fn list(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidQuery(query): ValidQuery<ProductListQuery>,
) -> ApiResult<Vec<Product>> {
    let store_id = access.store_id();

    let filter = ProductFilter {
        search: query.search,
        status: query.status,
        featured_only: query.featured == Some(true),
    };
    let page = PageRequest::new(query.page, query.limit);

    let (products, meta) = ProductRepository::new(state.pool())
        .list(store_id, &filter, page)
        .await?;

    Ok(ApiResponse::paginated(products, meta))
}

/// Product detail with categories and collections.
///
/// `GET /api/v1/stores/{storeId}/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, ProductId)>,
) -> ApiResult<ProductDetail> {
    let store_id = access.store_id();

    let products = ProductRepository::new(state.pool());
    let product = products
        .get(store_id, id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Product))?;
    let categories = products.categories(id).await?;
    let collections = products.collections(id).await?;

    Ok(ApiResponse::ok(ProductDetail {
        product,
        categories,
        collections,
    }))
}

/// Update a product; provided link lists replace the current ones.
///
/// `PATCH /api/v1/stores/{storeId}/products/{id}`
pub async fn update(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, ProductId)>,
    ValidJson(body): ValidJson<UpdateProductRequest>,
) -> ApiResult<Product> {
    let store_id = access.store_id();

    let (category_ids, collection_ids) = check_links(
        &state,
        store_id,
        body.category_ids.as_deref(),
        body.collection_ids.as_deref(),
    )
    .await?;

    let changes = ProductChanges {
        title: body.title,
        description: body.description,
        slug: body.slug.as_deref().map(normalize_slug).transpose()?,
        price: body.price.map(round_money),
        compare_at_price: body.compare_at_price.map(|p| p.map(round_money)),
        sku: body.sku,
        barcode: body.barcode,
        quantity: body.quantity,
        track_inventory: body.track_inventory,
        status: body.status,
        featured: body.featured,
        seo_title: body.seo_title,
        seo_description: body.seo_description,
        category_ids,
        collection_ids,
    };

    let product = ProductRepository::new(state.pool())
        .update(store_id, id, changes)
        .await
        .map_err(missing(Entity::Product))?;

    Ok(ApiResponse::ok(product))
}

/// Delete a product. Past order lines keep their snapshot.
///
/// `DELETE /api/v1/stores/{storeId}/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, ProductId)>,
) -> ApiResult<Message> {
    let store_id = access.store_id();

    ProductRepository::new(state.pool())
        .delete(store_id, id)
        .await
        .map_err(missing(Entity::Product))?;

    Ok(ApiResponse::message("Product deleted successfully"))
}
