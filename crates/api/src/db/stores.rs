//! Store and membership repository.
//!
//! Store creation and every membership change run in a transaction. Role
//! changes and removals lock the store's membership rows so the "at least one
//! owner" rule cannot be raced past.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use etic_core::{CurrencyCode, Email, StoreId, StorePlan, StoreRole, StoreStatus, UserId};

use super::RepositoryError;
use crate::models::store::{Member, Membership, Store, StoreCounts, StoreSummary};

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    slug: String,
    name: String,
    description: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    company_name: Option<String>,
    tax_number: Option<String>,
    plan: StorePlan,
    status: StoreStatus,
    default_currency: String,
    default_language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let default_currency = CurrencyCode::parse(&row.default_currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            email: row.email,
            phone: row.phone,
            company_name: row.company_name,
            tax_number: row.tax_number,
            plan: row.plan,
            status: row.status,
            default_currency,
            default_language: row.default_language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    products: i64,
    orders: i64,
    customers: i64,
    categories: i64,
}

impl From<CountsRow> for StoreCounts {
    fn from(row: CountsRow) -> Self {
        Self {
            products: row.products,
            orders: row.orders,
            customers: row.customers,
            categories: row.categories,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    store: StoreRow,
    role: StoreRole,
    #[sqlx(flatten)]
    counts: CountsRow,
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    user_id: UserId,
    email: Email,
    name: Option<String>,
    role: StoreRole,
    joined_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            user_id: row.user_id,
            email: row.email,
            name: row.name,
            role: row.role,
            joined_at: row.joined_at,
        }
    }
}

const STORE_COLUMNS: &str = "s.id, s.slug, s.name, s.description, s.email, s.phone, \
    s.company_name, s.tax_number, s.plan, s.status, s.default_currency, s.default_language, \
    s.created_at, s.updated_at";

const COUNT_COLUMNS: &str = "\
    (SELECT COUNT(*) FROM products p WHERE p.store_id = s.id) AS products, \
    (SELECT COUNT(*) FROM orders o WHERE o.store_id = s.id) AS orders, \
    (SELECT COUNT(*) FROM customers c WHERE c.store_id = s.id) AS customers, \
    (SELECT COUNT(*) FROM categories g WHERE g.store_id = s.id) AS categories";

const MEMBER_SELECT: &str = "\
    SELECT m.user_id, u.email, u.name, m.role, m.created_at AS joined_at \
    FROM store_members m JOIN users u ON u.id = m.user_id";

/// Fields for a new store.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub default_currency: CurrencyCode,
    pub default_language: String,
}

/// Store settings changes. `None` leaves a column untouched; `Some(None)`
/// clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct StoreChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub company_name: Option<Option<String>>,
    pub tax_number: Option<Option<String>>,
    pub default_currency: Option<CurrencyCode>,
    pub default_language: Option<String>,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a store and make `owner` its first OWNER.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, owner: UserId, store: NewStore) -> Result<Store, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: StoreRow = sqlx::query_as(&format!(
            "INSERT INTO stores AS s (id, slug, name, description, email, phone, \
                 default_currency, default_language) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(StoreId::new())
        .bind(&store.slug)
        .bind(&store.name)
        .bind(&store.description)
        .bind(&store.email)
        .bind(&store.phone)
        .bind(store.default_currency.as_str())
        .bind(&store.default_language)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "store slug already taken"))?;

        sqlx::query("INSERT INTO store_members (store_id, user_id, role) VALUES ($1, $2, 'OWNER')")
            .bind(row.id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> =
            sqlx::query_as(&format!("SELECT {STORE_COLUMNS} FROM stores s WHERE s.id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Stores the user belongs to, with their role and counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<StoreSummary>, RepositoryError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS}, m.role, {COUNT_COLUMNS} \
             FROM stores s JOIN store_members m ON m.store_id = s.id \
             WHERE m.user_id = $1 \
             ORDER BY s.created_at DESC"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(StoreSummary {
                    store: r.store.try_into()?,
                    role: r.role,
                    counts: r.counts.into(),
                })
            })
            .collect()
    }

    /// Row counts for one store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self, id: StoreId) -> Result<StoreCounts, RepositoryError> {
        let row: CountsRow =
            sqlx::query_as(&format!("SELECT {COUNT_COLUMNS} FROM stores s WHERE s.id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Apply settings changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE stores AS s SET updated_at = now()");

        if let Some(name) = changes.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(description) = changes.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(email) = changes.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(phone) = changes.phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(company_name) = changes.company_name {
            qb.push(", company_name = ").push_bind(company_name);
        }
        if let Some(tax_number) = changes.tax_number {
            qb.push(", tax_number = ").push_bind(tax_number);
        }
        if let Some(currency) = changes.default_currency {
            qb.push(", default_currency = ")
                .push_bind(currency.as_str().to_owned());
        }
        if let Some(language) = changes.default_language {
            qb.push(", default_language = ").push_bind(language);
        }

        qb.push(" WHERE s.id = ").push_bind(id);
        qb.push(format!(" RETURNING {STORE_COLUMNS}"));

        let row: StoreRow = qb
            .build_query_as::<StoreRow>()
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a store. All tenant data cascades.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: StoreId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Memberships
    // =========================================================================

    /// Look up a user's membership in a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn membership(
        &self,
        store: StoreId,
        user: UserId,
    ) -> Result<Option<Membership>, RepositoryError> {
        let role: Option<StoreRole> = sqlx::query_scalar(
            "SELECT role FROM store_members WHERE store_id = $1 AND user_id = $2",
        )
        .bind(store)
        .bind(user)
        .fetch_optional(self.pool)
        .await?;

        Ok(role.map(|role| Membership {
            store_id: store,
            user_id: user,
            role,
        }))
    }

    /// Members of a store, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn members(&self, store: StoreId) -> Result<Vec<Member>, RepositoryError> {
        let rows: Vec<MemberRow> = sqlx::query_as(&format!(
            "{MEMBER_SELECT} WHERE m.store_id = $1 ORDER BY m.created_at, u.email"
        ))
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add an existing user to a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user is already a member.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add_member(
        &self,
        store: StoreId,
        user: UserId,
        role: StoreRole,
    ) -> Result<Member, RepositoryError> {
        let row: MemberRow = sqlx::query_as(
            r"
            WITH m AS (
                INSERT INTO store_members (store_id, user_id, role)
                VALUES ($1, $2, $3)
                RETURNING user_id, role, created_at
            )
            SELECT m.user_id, u.email, u.name, m.role, m.created_at AS joined_at
            FROM m JOIN users u ON u.id = m.user_id
            ",
        )
        .bind(store)
        .bind(user)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "user is already a member of this store"))?;

        Ok(row.into())
    }

    /// Change a member's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is not a member.
    /// Returns `RepositoryError::Conflict` if this would demote the last owner.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_member_role(
        &self,
        store: StoreId,
        user: UserId,
        role: StoreRole,
    ) -> Result<Member, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let roles = lock_member_roles(&mut tx, store).await?;
        let current = roles
            .iter()
            .find(|(id, _)| *id == user)
            .map(|(_, role)| *role)
            .ok_or(RepositoryError::NotFound)?;

        if current == StoreRole::Owner && role != StoreRole::Owner && owner_count(&roles) <= 1 {
            return Err(RepositoryError::Conflict(
                "a store must keep at least one owner".to_owned(),
            ));
        }

        sqlx::query("UPDATE store_members SET role = $3 WHERE store_id = $1 AND user_id = $2")
            .bind(store)
            .bind(user)
            .bind(role)
            .execute(&mut *tx)
            .await?;

        let row: MemberRow = sqlx::query_as(&format!(
            "{MEMBER_SELECT} WHERE m.store_id = $1 AND m.user_id = $2"
        ))
        .bind(store)
        .bind(user)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Remove a member from a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is not a member.
    /// Returns `RepositoryError::Conflict` if this would remove the last owner.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_member(&self, store: StoreId, user: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let roles = lock_member_roles(&mut tx, store).await?;
        let current = roles
            .iter()
            .find(|(id, _)| *id == user)
            .map(|(_, role)| *role)
            .ok_or(RepositoryError::NotFound)?;

        if current == StoreRole::Owner && owner_count(&roles) <= 1 {
            return Err(RepositoryError::Conflict(
                "cannot remove the last owner of a store".to_owned(),
            ));
        }

        sqlx::query("DELETE FROM store_members WHERE store_id = $1 AND user_id = $2")
            .bind(store)
            .bind(user)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn lock_member_roles(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    store: StoreId,
) -> Result<Vec<(UserId, StoreRole)>, RepositoryError> {
    let rows: Vec<(UserId, StoreRole)> = sqlx::query_as(
        "SELECT user_id, role FROM store_members WHERE store_id = $1 FOR UPDATE",
    )
    .bind(store)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}

fn owner_count(roles: &[(UserId, StoreRole)]) -> usize {
    roles
        .iter()
        .filter(|(_, role)| *role == StoreRole::Owner)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_count() {
        let roles = [
            (UserId::new(), StoreRole::Owner),
            (UserId::new(), StoreRole::Admin),
            (UserId::new(), StoreRole::Owner),
            (UserId::new(), StoreRole::Staff),
        ];
        assert_eq!(owner_count(&roles), 2);
        assert_eq!(owner_count(&[]), 0);
    }
}
