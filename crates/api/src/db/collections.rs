//! Collection repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use etic_core::{CollectionId, LocalizedText, ProductId, StoreId};

use super::RepositoryError;
use super::products::{PRODUCT_SUMMARY_COLUMNS, ProductSummaryRow};
use crate::models::catalog::{Collection, CollectionListItem, ProductSummary};

#[derive(Debug, sqlx::FromRow)]
struct CollectionRow {
    id: CollectionId,
    store_id: StoreId,
    title: Json<LocalizedText>,
    description: Option<Json<LocalizedText>>,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Self {
            id: row.id,
            store_id: row.store_id,
            title: row.title.0,
            description: row.description.map(|d| d.0),
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CollectionListRow {
    #[sqlx(flatten)]
    collection: CollectionRow,
    product_count: i64,
}

const COLLECTION_COLUMNS: &str =
    "c.id, c.store_id, c.title, c.description, c.slug, c.created_at, c.updated_at";

/// Fields for a new collection.
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub title: LocalizedText,
    pub description: Option<LocalizedText>,
    pub slug: String,
    /// Initial members, in display order.
    pub product_ids: Vec<ProductId>,
}

/// Repository for collection database operations.
pub struct CollectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepository<'a> {
    /// Create a new collection repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a collection, linking `product_ids` in the given order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        store: StoreId,
        collection: NewCollection,
    ) -> Result<Collection, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: CollectionRow = sqlx::query_as(&format!(
            "INSERT INTO collections AS c (id, store_id, title, description, slug) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLLECTION_COLUMNS}"
        ))
        .bind(CollectionId::new())
        .bind(store)
        .bind(Json(&collection.title))
        .bind(collection.description.as_ref().map(Json))
        .bind(&collection.slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "collection slug already exists"))?;

        if !collection.product_ids.is_empty() {
            sqlx::query(
                r"
                INSERT INTO product_collections (product_id, collection_id, position)
                SELECT p.id, $1, (ids.ord - 1)::INTEGER
                FROM unnest($3::UUID[]) WITH ORDINALITY AS ids (id, ord)
                JOIN products p ON p.id = ids.id AND p.store_id = $2
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(row.id)
            .bind(store)
            .bind(collection.product_ids.as_slice())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    /// All collections of a store with product counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store: StoreId) -> Result<Vec<CollectionListItem>, RepositoryError> {
        let rows: Vec<CollectionListRow> = sqlx::query_as(&format!(
            "SELECT {COLLECTION_COLUMNS}, \
                 (SELECT COUNT(*) FROM product_collections pc WHERE pc.collection_id = c.id) \
                     AS product_count \
             FROM collections c \
             WHERE c.store_id = $1 \
             ORDER BY c.created_at DESC"
        ))
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CollectionListItem {
                collection: r.collection.into(),
                product_count: r.product_count,
            })
            .collect())
    }

    /// Get a collection by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        store: StoreId,
        id: CollectionId,
    ) -> Result<Option<Collection>, RepositoryError> {
        let row: Option<CollectionRow> = sqlx::query_as(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections c WHERE c.store_id = $1 AND c.id = $2"
        ))
        .bind(store)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Products in a collection, by position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(
        &self,
        store: StoreId,
        id: CollectionId,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows: Vec<ProductSummaryRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_SUMMARY_COLUMNS} FROM products p \
             JOIN product_collections pc ON pc.product_id = p.id \
             WHERE p.store_id = $1 AND pc.collection_id = $2 \
             ORDER BY pc.position, p.created_at"
        ))
        .bind(store)
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete a collection. Product links go with it; products stay.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, store: StoreId, id: CollectionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM collections WHERE store_id = $1 AND id = $2")
            .bind(store)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Return the IDs from `ids` that don't name a collection in this store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn missing_ids(
        &self,
        store: StoreId,
        ids: &[CollectionId],
    ) -> Result<Vec<CollectionId>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<CollectionId> =
            sqlx::query_scalar("SELECT id FROM collections WHERE store_id = $1 AND id = ANY($2)")
                .bind(store)
                .bind(ids)
                .fetch_all(self.pool)
                .await?;

        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }
}
