//! Catalog domain types: categories, products and collections.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use etic_core::{
    CategoryId, CollectionId, LocalizedText, ProductId, ProductStatus, StoreId,
};

/// A node in a store's category tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub store_id: StoreId,
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    /// Sort key among siblings; not unique.
    pub position: i32,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category in the list view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListItem {
    #[serde(flatten)]
    pub category: Category,
    pub child_count: i64,
    pub product_count: i64,
}

/// Minimal category reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: LocalizedText,
    pub slug: String,
}

/// A category with its neighbourhood.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub parent: Option<CategoryRef>,
    pub children: Vec<Category>,
    pub products: Vec<ProductSummary>,
}

/// A sellable catalog item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    pub slug: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i32,
    pub track_inventory: bool,
    pub status: ProductStatus,
    pub featured: bool,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its category and collection links.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub categories: Vec<CategoryRef>,
    pub collections: Vec<CollectionRef>,
}

/// Product fields used in lists of other resources.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: LocalizedText,
    pub slug: String,
    pub price: Decimal,
    pub sku: Option<String>,
    pub status: ProductStatus,
}

/// A curated, ordered group of products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub store_id: StoreId,
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A collection in the list view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionListItem {
    #[serde(flatten)]
    pub collection: Collection,
    pub product_count: i64,
}

/// A collection with its products in position order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub products: Vec<ProductSummary>,
}

/// A product's membership in a collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRef {
    pub id: CollectionId,
    pub title: LocalizedText,
    pub slug: String,
    pub position: i32,
}
