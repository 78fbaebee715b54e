//! Category repository.
//!
//! Categories form a per-store tree through `parent_id`. Parent changes lock
//! the store's category rows and walk the ancestor chain before writing, so
//! two concurrent moves cannot build a loop between them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use etic_core::hierarchy::creates_cycle;
use etic_core::{CategoryId, LocalizedText, StoreId};

use super::RepositoryError;
use super::products::{PRODUCT_SUMMARY_COLUMNS, ProductSummaryRow};
use crate::models::catalog::{Category, CategoryListItem, CategoryRef, ProductSummary};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    store_id: StoreId,
    name: Json<LocalizedText>,
    description: Option<Json<LocalizedText>>,
    slug: String,
    parent_id: Option<CategoryId>,
    position: i32,
    is_visible: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            store_id: row.store_id,
            name: row.name.0,
            description: row.description.map(|d| d.0),
            slug: row.slug,
            parent_id: row.parent_id,
            position: row.position,
            is_visible: row.is_visible,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryListRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    child_count: i64,
    product_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CategoryRefRow {
    id: CategoryId,
    name: Json<LocalizedText>,
    slug: String,
}

impl From<CategoryRefRow> for CategoryRef {
    fn from(row: CategoryRefRow) -> Self {
        Self {
            id: row.id,
            name: row.name.0,
            slug: row.slug,
        }
    }
}

const CATEGORY_COLUMNS: &str = "c.id, c.store_id, c.name, c.description, c.slug, c.parent_id, \
    c.position, c.is_visible, c.created_at, c.updated_at";

/// Fields for a new category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub position: i32,
    pub is_visible: bool,
}

/// Category changes. `None` leaves a column untouched; `Some(None)` clears a
/// nullable column.
#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<LocalizedText>,
    pub description: Option<Option<LocalizedText>>,
    pub slug: Option<String>,
    pub parent_id: Option<Option<CategoryId>>,
    pub position: Option<i32>,
    pub is_visible: Option<bool>,
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the parent is not in this store.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        store: StoreId,
        category: NewCategory,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent) = category.parent_id {
            let parents = lock_parent_map(&mut tx, store).await?;
            if !parents.contains_key(&parent) {
                return Err(parent_not_found());
            }
        }

        let row: CategoryRow = sqlx::query_as(&format!(
            "INSERT INTO categories AS c \
                 (id, store_id, name, description, slug, parent_id, position, is_visible) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(CategoryId::new())
        .bind(store)
        .bind(Json(&category.name))
        .bind(category.description.as_ref().map(Json))
        .bind(&category.slug)
        .bind(category.parent_id)
        .bind(category.position)
        .bind(category.is_visible)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category slug already exists"))?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// All categories of a store, ordered by position then creation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store: StoreId) -> Result<Vec<CategoryListItem>, RepositoryError> {
        let rows: Vec<CategoryListRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS}, \
                 (SELECT COUNT(*) FROM categories ch WHERE ch.parent_id = c.id) AS child_count, \
                 (SELECT COUNT(*) FROM product_categories pc WHERE pc.category_id = c.id) \
                     AS product_count \
             FROM categories c \
             WHERE c.store_id = $1 \
             ORDER BY c.position, c.created_at"
        ))
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CategoryListItem {
                category: r.category.into(),
                child_count: r.child_count,
                product_count: r.product_count,
            })
            .collect())
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        store: StoreId,
        id: CategoryId,
    ) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories c WHERE c.store_id = $1 AND c.id = $2"
        ))
        .bind(store)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Direct children of a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn children(
        &self,
        store: StoreId,
        id: CategoryId,
    ) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories c \
             WHERE c.store_id = $1 AND c.parent_id = $2 \
             ORDER BY c.position, c.created_at"
        ))
        .bind(store)
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Reference to a category, for parent links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_ref(
        &self,
        store: StoreId,
        id: CategoryId,
    ) -> Result<Option<CategoryRef>, RepositoryError> {
        let row: Option<CategoryRefRow> = sqlx::query_as(
            "SELECT id, name, slug FROM categories WHERE store_id = $1 AND id = $2",
        )
        .bind(store)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Products linked to a category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(
        &self,
        store: StoreId,
        id: CategoryId,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows: Vec<ProductSummaryRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_SUMMARY_COLUMNS} FROM products p \
             JOIN product_categories pc ON pc.product_id = p.id \
             WHERE p.store_id = $1 AND pc.category_id = $2 \
             ORDER BY p.created_at DESC"
        ))
        .bind(store)
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Apply category changes.
    ///
    /// A parent change is refused when the new parent is the category itself,
    /// one of its descendants, or not in this store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Invalid` for a bad parent.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        store: StoreId,
        id: CategoryId,
        changes: CategoryChanges,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(Some(parent)) = changes.parent_id {
            let parents = lock_parent_map(&mut tx, store).await?;
            if !parents.contains_key(&id) {
                return Err(RepositoryError::NotFound);
            }
            if !parents.contains_key(&parent) {
                return Err(parent_not_found());
            }
            if creates_cycle(id, parent, &parents) {
                return Err(RepositoryError::Invalid {
                    field: "parentId",
                    message: "a category cannot be moved under itself or its descendants"
                        .to_owned(),
                });
            }
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE categories AS c SET updated_at = now()");

        if let Some(name) = changes.name {
            qb.push(", name = ").push_bind(Json(name));
        }
        if let Some(description) = changes.description {
            qb.push(", description = ").push_bind(description.map(Json));
        }
        if let Some(slug) = changes.slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(parent_id) = changes.parent_id {
            qb.push(", parent_id = ").push_bind(parent_id);
        }
        if let Some(position) = changes.position {
            qb.push(", position = ").push_bind(position);
        }
        if let Some(is_visible) = changes.is_visible {
            qb.push(", is_visible = ").push_bind(is_visible);
        }

        qb.push(" WHERE c.store_id = ").push_bind(store);
        qb.push(" AND c.id = ").push_bind(id);
        qb.push(format!(" RETURNING {CATEGORY_COLUMNS}"));

        let row: CategoryRow = qb
            .build_query_as::<CategoryRow>()
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "category slug already exists"))?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete a category, moving its children up to its parent.
    ///
    /// Product links to the category are removed with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, store: StoreId, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let parents = lock_parent_map(&mut tx, store).await?;
        let grandparent = *parents.get(&id).ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            "UPDATE categories SET parent_id = $3, updated_at = now() \
             WHERE store_id = $1 AND parent_id = $2",
        )
        .bind(store)
        .bind(id)
        .bind(grandparent)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM categories WHERE store_id = $1 AND id = $2")
            .bind(store)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Return the IDs from `ids` that don't name a category in this store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn missing_ids(
        &self,
        store: StoreId,
        ids: &[CategoryId],
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<CategoryId> =
            sqlx::query_scalar("SELECT id FROM categories WHERE store_id = $1 AND id = ANY($2)")
                .bind(store)
                .bind(ids)
                .fetch_all(self.pool)
                .await?;

        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }
}

/// Lock every category row of the store and return `id -> parent_id`.
async fn lock_parent_map(
    tx: &mut Transaction<'_, Postgres>,
    store: StoreId,
) -> Result<HashMap<CategoryId, Option<CategoryId>>, RepositoryError> {
    let rows: Vec<(CategoryId, Option<CategoryId>)> =
        sqlx::query_as("SELECT id, parent_id FROM categories WHERE store_id = $1 FOR UPDATE")
            .bind(store)
            .fetch_all(&mut **tx)
            .await?;

    Ok(rows.into_iter().collect())
}

fn parent_not_found() -> RepositoryError {
    RepositoryError::Invalid {
        field: "parentId",
        message: "parent category not found".to_owned(),
    }
}
