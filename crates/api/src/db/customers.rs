//! Customer and address repository.
//!
//! A customer has at most one default address. Address writes lock the
//! customer row, clear any other default and set the new one in the same
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use etic_core::{AddressId, CustomerId, Email, PageMeta, PageRequest, StoreId};

use super::{RepositoryError, like_pattern};
use crate::models::customer::{Customer, CustomerAddress, CustomerListItem};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    store_id: StoreId,
    email: Email,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    accepts_marketing: bool,
    tags: Vec<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            store_id: row.store_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            accepts_marketing: row.accepts_marketing,
            tags: row.tags,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerListRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    order_count: i64,
    address_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    customer_id: CustomerId,
    first_name: String,
    last_name: String,
    company: Option<String>,
    address1: String,
    address2: Option<String>,
    city: String,
    province: Option<String>,
    zip: String,
    country: String,
    phone: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for CustomerAddress {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            first_name: row.first_name,
            last_name: row.last_name,
            company: row.company,
            address1: row.address1,
            address2: row.address2,
            city: row.city,
            province: row.province,
            zip: row.zip,
            country: row.country,
            phone: row.phone,
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

const CUSTOMER_COLUMNS: &str = "c.id, c.store_id, c.email, c.first_name, c.last_name, c.phone, \
    c.accepts_marketing, c.tags, c.note, c.created_at, c.updated_at";

const ADDRESS_COLUMNS: &str = "id, customer_id, first_name, last_name, company, address1, \
    address2, city, province, zip, country, phone, is_default, created_at";

/// Fields for a new customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub accepts_marketing: bool,
    /// Already deduplicated.
    pub tags: Vec<String>,
    pub note: Option<String>,
}

/// Customer changes. `None` leaves a column untouched; `Some(None)` clears a
/// nullable column.
#[derive(Debug, Clone, Default)]
pub struct CustomerChanges {
    pub email: Option<Email>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub accepts_marketing: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub note: Option<Option<String>>,
}

/// Fields for a new address.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub province: Option<String>,
    pub zip: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
}

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already used in
    /// this store.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        store: StoreId,
        customer: NewCustomer,
    ) -> Result<Customer, RepositoryError> {
        let row: CustomerRow = sqlx::query_as(&format!(
            "INSERT INTO customers AS c \
                 (id, store_id, email, first_name, last_name, phone, accepts_marketing, tags, note) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(CustomerId::new())
        .bind(store)
        .bind(&customer.email)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(customer.accepts_marketing)
        .bind(&customer.tags)
        .bind(&customer.note)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "customer email already exists"))?;

        Ok(row.into())
    }

    /// A page of customers, newest first, optionally filtered by a
    /// case-insensitive substring of email, first name or last name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        store: StoreId,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<CustomerListItem>, PageMeta), RepositoryError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM customers c");
        push_search_where(&mut count, store, search);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut select = QueryBuilder::new(format!(
            "SELECT {CUSTOMER_COLUMNS}, \
                 (SELECT COUNT(*) FROM orders o WHERE o.customer_id = c.id) AS order_count, \
                 (SELECT COUNT(*) FROM customer_addresses a WHERE a.customer_id = c.id) \
                     AS address_count \
             FROM customers c"
        ));
        push_search_where(&mut select, store, search);
        select
            .push(" ORDER BY c.created_at DESC, c.id LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<CustomerListRow> = select
            .build_query_as::<CustomerListRow>()
            .fetch_all(self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(|r| CustomerListItem {
                customer: r.customer.into(),
                order_count: r.order_count,
                address_count: r.address_count,
            })
            .collect();

        Ok((items, page.meta(total)))
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        store: StoreId,
        id: CustomerId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE c.store_id = $1 AND c.id = $2"
        ))
        .bind(store)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Apply customer changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        store: StoreId,
        id: CustomerId,
        changes: CustomerChanges,
    ) -> Result<Customer, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE customers AS c SET updated_at = now()");

        if let Some(email) = changes.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(first_name) = changes.first_name {
            qb.push(", first_name = ").push_bind(first_name);
        }
        if let Some(last_name) = changes.last_name {
            qb.push(", last_name = ").push_bind(last_name);
        }
        if let Some(phone) = changes.phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(accepts_marketing) = changes.accepts_marketing {
            qb.push(", accepts_marketing = ").push_bind(accepts_marketing);
        }
        if let Some(tags) = changes.tags {
            qb.push(", tags = ").push_bind(tags);
        }
        if let Some(note) = changes.note {
            qb.push(", note = ").push_bind(note);
        }

        qb.push(" WHERE c.store_id = ").push_bind(store);
        qb.push(" AND c.id = ").push_bind(id);
        qb.push(format!(" RETURNING {CUSTOMER_COLUMNS}"));

        let row: CustomerRow = qb
            .build_query_as::<CustomerRow>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "customer email already exists"))?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// A customer's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn addresses(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<CustomerAddress>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM customer_addresses \
             WHERE customer_id = $1 \
             ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(customer)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add an address. The customer's first address, or one flagged default,
    /// becomes the only default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_address(
        &self,
        store: StoreId,
        customer: CustomerId,
        address: NewAddress,
    ) -> Result<CustomerAddress, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_customer(&mut tx, store, customer).await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM customer_addresses WHERE customer_id = $1")
                .bind(customer)
                .fetch_one(&mut *tx)
                .await?;

        let is_default = address.is_default || existing == 0;
        if is_default {
            sqlx::query(
                "UPDATE customer_addresses SET is_default = FALSE \
                 WHERE customer_id = $1 AND is_default",
            )
            .bind(customer)
            .execute(&mut *tx)
            .await?;
        }

        let row: AddressRow = sqlx::query_as(&format!(
            "INSERT INTO customer_addresses \
                 (id, customer_id, first_name, last_name, company, address1, address2, city, \
                  province, zip, country, phone, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(AddressId::new())
        .bind(customer)
        .bind(&address.first_name)
        .bind(&address.last_name)
        .bind(&address.company)
        .bind(&address.address1)
        .bind(&address.address2)
        .bind(&address.city)
        .bind(&address.province)
        .bind(&address.zip)
        .bind(&address.country)
        .bind(&address.phone)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete an address. If it was the default, the newest remaining address
    /// takes over.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer or address doesn't
    /// exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_address(
        &self,
        store: StoreId,
        customer: CustomerId,
        address: AddressId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_customer(&mut tx, store, customer).await?;

        let was_default: bool = sqlx::query_scalar(
            "DELETE FROM customer_addresses WHERE customer_id = $1 AND id = $2 \
             RETURNING is_default",
        )
        .bind(customer)
        .bind(address)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if was_default {
            sqlx::query(
                r"
                UPDATE customer_addresses SET is_default = TRUE
                WHERE id = (
                    SELECT id FROM customer_addresses
                    WHERE customer_id = $1
                    ORDER BY created_at DESC, id
                    LIMIT 1
                )
                ",
            )
            .bind(customer)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn push_search_where(qb: &mut QueryBuilder<'_, Postgres>, store: StoreId, search: Option<&str>) {
    qb.push(" WHERE c.store_id = ").push_bind(store);
    if let Some(term) = search {
        let pattern = like_pattern(term);
        qb.push(" AND (c.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Lock a customer row, confirming it belongs to `store`.
async fn lock_customer(
    tx: &mut Transaction<'_, Postgres>,
    store: StoreId,
    customer: CustomerId,
) -> Result<(), RepositoryError> {
    let found: Option<CustomerId> =
        sqlx::query_scalar("SELECT id FROM customers WHERE store_id = $1 AND id = $2 FOR UPDATE")
            .bind(store)
            .bind(customer)
            .fetch_optional(&mut **tx)
            .await?;

    found.map(|_| ()).ok_or(RepositoryError::NotFound)
}
