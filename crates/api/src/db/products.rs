//! Product repository.
//!
//! Products own their category and collection links. Replacing either link
//! set deletes the old rows and inserts the new ones in the same transaction
//! as the product write.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use etic_core::{
    CategoryId, CollectionId, LocalizedText, PageMeta, PageRequest, ProductId, ProductStatus,
    StoreId,
};

use super::categories::CategoryRefRow;
use super::{RepositoryError, like_pattern};
use crate::models::catalog::{CategoryRef, CollectionRef, Product, ProductSummary};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    store_id: StoreId,
    title: Json<LocalizedText>,
    description: Option<Json<LocalizedText>>,
    slug: String,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    sku: Option<String>,
    barcode: Option<String>,
    quantity: i32,
    track_inventory: bool,
    status: ProductStatus,
    featured: bool,
    seo_title: Option<String>,
    seo_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            store_id: row.store_id,
            title: row.title.0,
            description: row.description.map(|d| d.0),
            slug: row.slug,
            price: row.price,
            compare_at_price: row.compare_at_price,
            sku: row.sku,
            barcode: row.barcode,
            quantity: row.quantity,
            track_inventory: row.track_inventory,
            status: row.status,
            featured: row.featured,
            seo_title: row.seo_title,
            seo_description: row.seo_description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Columns for [`ProductSummaryRow`], selected from `products p`.
pub(super) const PRODUCT_SUMMARY_COLUMNS: &str = "p.id, p.title, p.slug, p.price, p.sku, p.status";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductSummaryRow {
    id: ProductId,
    title: Json<LocalizedText>,
    slug: String,
    price: Decimal,
    sku: Option<String>,
    status: ProductStatus,
}

impl From<ProductSummaryRow> for ProductSummary {
    fn from(row: ProductSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title.0,
            slug: row.slug,
            price: row.price,
            sku: row.sku,
            status: row.status,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CollectionRefRow {
    id: CollectionId,
    title: Json<LocalizedText>,
    slug: String,
    position: i32,
}

const PRODUCT_COLUMNS: &str = "p.id, p.store_id, p.title, p.description, p.slug, p.price, \
    p.compare_at_price, p.sku, p.barcode, p.quantity, p.track_inventory, p.status, p.featured, \
    p.seo_title, p.seo_description, p.created_at, p.updated_at";

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
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
    /// Deduplicated category links.
    pub category_ids: Vec<CategoryId>,
    /// Collection links; position follows list order.
    pub collection_ids: Vec<CollectionId>,
}

/// Product changes. `None` leaves a column untouched; `Some(None)` clears a
/// nullable column. A provided link list replaces the whole link set.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub title: Option<LocalizedText>,
    pub description: Option<Option<LocalizedText>>,
    pub slug: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Option<Decimal>>,
    pub sku: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub quantity: Option<i32>,
    pub track_inventory: Option<bool>,
    pub status: Option<ProductStatus>,
    pub featured: Option<bool>,
    pub seo_title: Option<Option<String>>,
    pub seo_description: Option<Option<String>>,
    pub category_ids: Option<Vec<CategoryId>>,
    pub collection_ids: Option<Vec<CollectionId>>,
}

/// Product list filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring of slug or SKU.
    pub search: Option<String>,
    pub status: Option<ProductStatus>,
    /// Only featured products when `true`.
    pub featured_only: bool,
}

impl ProductFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, store: StoreId) {
        qb.push(" WHERE p.store_id = ").push_bind(store);
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search.trim());
            qb.push(" AND (p.slug ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.sku ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = self.status {
            qb.push(" AND p.status = ").push_bind(status);
        }
        if self.featured_only {
            qb.push(" AND p.featured");
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a product with its links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        store: StoreId,
        product: NewProduct,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products AS p \
                 (id, store_id, title, description, slug, price, compare_at_price, sku, \
                  barcode, quantity, track_inventory, status, featured, seo_title, \
                  seo_description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(ProductId::new())
        .bind(store)
        .bind(Json(&product.title))
        .bind(product.description.as_ref().map(Json))
        .bind(&product.slug)
        .bind(product.price)
        .bind(product.compare_at_price)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(product.quantity)
        .bind(product.track_inventory)
        .bind(product.status)
        .bind(product.featured)
        .bind(&product.seo_title)
        .bind(&product.seo_description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product slug already exists"))?;

        replace_categories(&mut tx, store, row.id, &product.category_ids).await?;
        replace_collections(&mut tx, store, row.id, &product.collection_ids).await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// A page of products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        store: StoreId,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, PageMeta), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products p");
        filter.push_where(&mut count, store);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut select = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        filter.push_where(&mut select, store);
        select
            .push(" ORDER BY p.created_at DESC, p.id LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<ProductRow> = select
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), page.meta(total)))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        store: StoreId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.store_id = $1 AND p.id = $2"
        ))
        .bind(store)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Categories linked to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self, id: ProductId) -> Result<Vec<CategoryRef>, RepositoryError> {
        let rows: Vec<CategoryRefRow> = sqlx::query_as(
            r"
            SELECT c.id, c.name, c.slug
            FROM categories c
            JOIN product_categories pc ON pc.category_id = c.id
            WHERE pc.product_id = $1
            ORDER BY c.position, c.created_at
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Collections a product belongs to, with its position in each.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn collections(&self, id: ProductId) -> Result<Vec<CollectionRef>, RepositoryError> {
        let rows: Vec<CollectionRefRow> = sqlx::query_as(
            r"
            SELECT c.id, c.title, c.slug, pc.position
            FROM collections c
            JOIN product_collections pc ON pc.collection_id = c.id
            WHERE pc.product_id = $1
            ORDER BY pc.position, c.created_at
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CollectionRef {
                id: r.id,
                title: r.title.0,
                slug: r.slug,
                position: r.position,
            })
            .collect())
    }

    /// Apply product changes and replace any provided link sets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        store: StoreId,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE products AS p SET updated_at = now()");

        if let Some(title) = changes.title {
            qb.push(", title = ").push_bind(Json(title));
        }
        if let Some(description) = changes.description {
            qb.push(", description = ").push_bind(description.map(Json));
        }
        if let Some(slug) = changes.slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(price) = changes.price {
            qb.push(", price = ").push_bind(price);
        }
        if let Some(compare_at_price) = changes.compare_at_price {
            qb.push(", compare_at_price = ").push_bind(compare_at_price);
        }
        if let Some(sku) = changes.sku {
            qb.push(", sku = ").push_bind(sku);
        }
        if let Some(barcode) = changes.barcode {
            qb.push(", barcode = ").push_bind(barcode);
        }
        if let Some(quantity) = changes.quantity {
            qb.push(", quantity = ").push_bind(quantity);
        }
        if let Some(track_inventory) = changes.track_inventory {
            qb.push(", track_inventory = ").push_bind(track_inventory);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(featured) = changes.featured {
            qb.push(", featured = ").push_bind(featured);
        }
        if let Some(seo_title) = changes.seo_title {
            qb.push(", seo_title = ").push_bind(seo_title);
        }
        if let Some(seo_description) = changes.seo_description {
            qb.push(", seo_description = ").push_bind(seo_description);
        }

        qb.push(" WHERE p.store_id = ").push_bind(store);
        qb.push(" AND p.id = ").push_bind(id);
        qb.push(format!(" RETURNING {PRODUCT_COLUMNS}"));

        let row: ProductRow = qb
            .build_query_as::<ProductRow>()
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "product slug already exists"))?
            .ok_or(RepositoryError::NotFound)?;

        if let Some(category_ids) = &changes.category_ids {
            replace_categories(&mut tx, store, id, category_ids).await?;
        }
        if let Some(collection_ids) = &changes.collection_ids {
            replace_collections(&mut tx, store, id, collection_ids).await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete a product. Order items keep their snapshot with the link cleared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, store: StoreId, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE store_id = $1 AND id = $2")
            .bind(store)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Summaries for the given products, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summaries(
        &self,
        store: StoreId,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<ProductSummaryRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_SUMMARY_COLUMNS} FROM products p \
             WHERE p.store_id = $1 AND p.id = ANY($2)"
        ))
        .bind(store)
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Return the IDs from `ids` that don't name a product in this store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn missing_ids(
        &self,
        store: StoreId,
        ids: &[ProductId],
    ) -> Result<Vec<ProductId>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<ProductId> =
            sqlx::query_scalar("SELECT id FROM products WHERE store_id = $1 AND id = ANY($2)")
                .bind(store)
                .bind(ids)
                .fetch_all(self.pool)
                .await?;

        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }
}

/// Replace a product's category links. Only categories of `store` are linked.
async fn replace_categories(
    tx: &mut Transaction<'_, Postgres>,
    store: StoreId,
    product: ProductId,
    category_ids: &[CategoryId],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
        .bind(product)
        .execute(&mut **tx)
        .await?;

    if category_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r"
        INSERT INTO product_categories (product_id, category_id)
        SELECT $1, c.id FROM categories c
        WHERE c.store_id = $2 AND c.id = ANY($3)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(product)
    .bind(store)
    .bind(category_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Replace a product's collection links.
///
/// Links the product keeps stay where they are; new links go to the end of
/// their collection.
async fn replace_collections(
    tx: &mut Transaction<'_, Postgres>,
    store: StoreId,
    product: ProductId,
    collection_ids: &[CollectionId],
) -> Result<(), RepositoryError> {
    sqlx::query(
        "DELETE FROM product_collections WHERE product_id = $1 AND collection_id <> ALL($2)",
    )
    .bind(product)
    .bind(collection_ids)
    .execute(&mut **tx)
    .await?;

    if collection_ids.is_empty() {
        return Ok(());
    }

    // Serialize appends to the same collection
    sqlx::query(
        "SELECT id FROM collections WHERE store_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
    )
    .bind(store)
    .bind(collection_ids)
    .fetch_all(&mut **tx)
    .await?;

    sqlx::query(
        r"
        INSERT INTO product_collections (product_id, collection_id, position)
        SELECT $1, c.id,
               COALESCE(
                   (SELECT MAX(pc.position) FROM product_collections pc
                    WHERE pc.collection_id = c.id),
                   -1
               ) + 1
        FROM collections c
        WHERE c.store_id = $2 AND c.id = ANY($3)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(product)
    .bind(store)
    .bind(collection_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
