//! Order repository.
//!
//! Orders are written once, with their items, and afterwards change only
//! through [`OrderRepository::update_status`]. The per-store order number is
//! taken from `stores.order_sequence` inside the insert transaction; the row
//! lock on the store serializes concurrent creations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use etic_core::order_number::format_order_number;
use etic_core::{
    CurrencyCode, CustomerId, Email, FulfillmentStatus, OrderId, OrderItemId, OrderStatus,
    OrderTotals, PageMeta, PageRequest, PaymentStatus, ProductId, StoreId,
};

use super::RepositoryError;
use crate::models::order::{
    AddressSnapshot, CustomerRef, Order, OrderDetail, OrderItem, OrderListItem,
};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    store_id: StoreId,
    order_number: String,
    customer_id: Option<CustomerId>,
    email: Email,
    phone: Option<String>,
    billing_address: Json<AddressSnapshot>,
    shipping_address: Json<AddressSnapshot>,
    currency: String,
    subtotal: Decimal,
    discount: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    order_status: OrderStatus,
    payment_status: PaymentStatus,
    fulfillment_status: FulfillmentStatus,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&row.currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            store_id: row.store_id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            email: row.email,
            phone: row.phone,
            billing_address: row.billing_address.0,
            shipping_address: row.shipping_address.0,
            currency,
            subtotal: row.subtotal,
            discount: row.discount,
            tax: row.tax,
            shipping: row.shipping,
            total: row.total,
            order_status: row.order_status,
            payment_status: row.payment_status,
            fulfillment_status: row.fulfillment_status,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Order columns plus the linked customer, from `orders o LEFT JOIN customers cu`.
#[derive(Debug, sqlx::FromRow)]
struct OrderWithCustomerRow {
    #[sqlx(flatten)]
    order: OrderRow,
    cu_id: Option<CustomerId>,
    cu_email: Option<Email>,
    cu_first_name: Option<String>,
    cu_last_name: Option<String>,
}

impl OrderWithCustomerRow {
    fn split(self) -> Result<(Order, Option<CustomerRef>), RepositoryError> {
        let customer = match (self.cu_id, self.cu_email) {
            (Some(id), Some(email)) => Some(CustomerRef {
                id,
                email,
                first_name: self.cu_first_name,
                last_name: self.cu_last_name,
            }),
            _ => None,
        };
        Ok((self.order.try_into()?, customer))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderListRow {
    #[sqlx(flatten)]
    inner: OrderWithCustomerRow,
    item_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    title: String,
    sku: Option<String>,
    quantity: i32,
    price: Decimal,
    total: Decimal,
    position: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            title: row.title,
            sku: row.sku,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
            position: row.position,
        }
    }
}

const ORDER_COLUMNS: &str = "o.id, o.store_id, o.order_number, o.customer_id, o.email, o.phone, \
    o.billing_address, o.shipping_address, o.currency, o.subtotal, o.discount, o.tax, \
    o.shipping, o.total, o.order_status, o.payment_status, o.fulfillment_status, o.note, \
    o.created_at, o.updated_at";

const CUSTOMER_REF_COLUMNS: &str = "cu.id AS cu_id, cu.email AS cu_email, \
    cu.first_name AS cu_first_name, cu.last_name AS cu_last_name";

const ITEM_COLUMNS: &str = "id, order_id, product_id, title, sku, quantity, price, total, position";

/// A line item ready to insert. `total` must equal `price * quantity`.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// A validated order ready to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Option<CustomerId>,
    pub email: Email,
    pub phone: Option<String>,
    pub billing_address: AddressSnapshot,
    pub shipping_address: AddressSnapshot,
    pub currency: CurrencyCode,
    pub totals: OrderTotals,
    pub items: Vec<NewOrderItem>,
    pub note: Option<String>,
}

/// Status overwrite. Absent fields keep their value.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusChanges {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    /// When set, the write only applies if the stored `updated_at` matches.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its items, assigning the next order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        store: StoreId,
        order: NewOrder,
    ) -> Result<OrderDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sequence: i64 = sqlx::query_scalar(
            "UPDATE stores SET order_sequence = order_sequence + 1 WHERE id = $1 \
             RETURNING order_sequence",
        )
        .bind(store)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders AS o \
                 (id, store_id, order_number, customer_id, email, phone, billing_address, \
                  shipping_address, currency, subtotal, discount, tax, shipping, total, note) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(OrderId::new())
        .bind(store)
        .bind(format_order_number(sequence))
        .bind(order.customer_id)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(Json(&order.billing_address))
        .bind(Json(&order.shipping_address))
        .bind(order.currency.as_str())
        .bind(order.totals.subtotal)
        .bind(order.totals.discount)
        .bind(order.totals.tax)
        .bind(order.totals.shipping)
        .bind(order.totals.total)
        .bind(&order.note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "order number already exists"))?;

        let order_id = row.id;
        let mut items = Vec::with_capacity(order.items.len());
        for (position, item) in order.items.into_iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Invalid {
                    field: "items",
                    message: "too many order items".to_owned(),
                })?;

            let item_row: OrderItemRow = sqlx::query_as(&format!(
                "INSERT INTO order_items \
                     (id, order_id, product_id, title, sku, quantity, price, total, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(OrderItemId::new())
            .bind(order_id)
            .bind(item.product_id)
            .bind(&item.title)
            .bind(&item.sku)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.total)
            .bind(position)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item_row.into());
        }

        let customer = match order.customer_id {
            Some(id) => {
                sqlx::query_as::<_, (CustomerId, Email, Option<String>, Option<String>)>(
                    "SELECT id, email, first_name, last_name FROM customers WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .map(|(id, email, first_name, last_name)| CustomerRef {
                    id,
                    email,
                    first_name,
                    last_name,
                })
            }
            None => None,
        };

        tx.commit().await?;

        Ok(OrderDetail {
            order: row.try_into()?,
            customer,
            items,
        })
    }

    /// A page of orders, newest first, optionally filtered by order status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        store: StoreId,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<(Vec<OrderListItem>, PageMeta), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders o");
        push_order_where(&mut count, store, status);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut select = list_select();
        push_order_where(&mut select, store, status);
        select
            .push(" ORDER BY o.created_at DESC, o.id LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<OrderListRow> = select
            .build_query_as::<OrderListRow>()
            .fetch_all(self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(into_list_item)
            .collect::<Result<_, _>>()?;

        Ok((items, page.meta(total)))
    }

    /// A customer's most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        store: StoreId,
        customer: CustomerId,
        limit: i64,
    ) -> Result<Vec<OrderListItem>, RepositoryError> {
        let mut select = list_select();
        select
            .push(" WHERE o.store_id = ")
            .push_bind(store)
            .push(" AND o.customer_id = ")
            .push_bind(customer)
            .push(" ORDER BY o.created_at DESC, o.id LIMIT ")
            .push_bind(limit);

        let rows: Vec<OrderListRow> = select
            .build_query_as::<OrderListRow>()
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(into_list_item).collect()
    }

    /// Get an order with its customer and items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        store: StoreId,
        id: OrderId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let row: Option<OrderWithCustomerRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS}, {CUSTOMER_REF_COLUMNS} \
             FROM orders o LEFT JOIN customers cu ON cu.id = o.customer_id \
             WHERE o.store_id = $1 AND o.id = $2"
        ))
        .bind(store)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let (order, customer) = row.split()?;
        let items = self.items_for(&[order.id]).await?.remove(&order.id);

        Ok(Some(OrderDetail {
            order,
            customer,
            items: items.unwrap_or_default(),
        }))
    }

    /// The newest orders of a store with customers and items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(
        &self,
        store: StoreId,
        limit: i64,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let rows: Vec<OrderWithCustomerRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS}, {CUSTOMER_REF_COLUMNS} \
             FROM orders o LEFT JOIN customers cu ON cu.id = o.customer_id \
             WHERE o.store_id = $1 \
             ORDER BY o.created_at DESC, o.id \
             LIMIT $2"
        ))
        .bind(store)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let (order, customer) = row.split()?;
                let items = items.remove(&order.id).unwrap_or_default();
                Ok(OrderDetail {
                    order,
                    customer,
                    items,
                })
            })
            .collect()
    }

    /// Overwrite the provided status fields and refresh `updated_at`.
    ///
    /// `updated_at` always moves forward, even when two writes land within
    /// the same clock tick.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if `expected_updated_at` is stale.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        store: StoreId,
        id: OrderId,
        changes: StatusChanges,
    ) -> Result<Order, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "UPDATE orders AS o SET updated_at = \
             GREATEST(clock_timestamp(), o.updated_at + INTERVAL '1 microsecond')",
        );

        if let Some(status) = changes.order_status {
            qb.push(", order_status = ").push_bind(status);
        }
        if let Some(status) = changes.payment_status {
            qb.push(", payment_status = ").push_bind(status);
        }
        if let Some(status) = changes.fulfillment_status {
            qb.push(", fulfillment_status = ").push_bind(status);
        }

        qb.push(" WHERE o.store_id = ").push_bind(store);
        qb.push(" AND o.id = ").push_bind(id);
        if let Some(expected) = changes.expected_updated_at {
            qb.push(" AND o.updated_at = ").push_bind(expected);
        }
        qb.push(format!(" RETURNING {ORDER_COLUMNS}"));

        let row: Option<OrderRow> = qb
            .build_query_as::<OrderRow>()
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None if changes.expected_updated_at.is_some() && self.exists(store, id).await? => {
                Err(RepositoryError::Conflict(
                    "order was modified since it was read".to_owned(),
                ))
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn exists(&self, store: StoreId, id: OrderId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE store_id = $1 AND id = $2)",
        )
        .bind(store)
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    async fn items_for(
        &self,
        orders: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        if orders.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items \
             WHERE order_id = ANY($1) \
             ORDER BY order_id, position"
        ))
        .bind(orders)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

fn list_select() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {ORDER_COLUMNS}, {CUSTOMER_REF_COLUMNS}, \
             (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count \
         FROM orders o LEFT JOIN customers cu ON cu.id = o.customer_id"
    ))
}

fn push_order_where(
    qb: &mut QueryBuilder<'_, Postgres>,
    store: StoreId,
    status: Option<OrderStatus>,
) {
    qb.push(" WHERE o.store_id = ").push_bind(store);
    if let Some(status) = status {
        qb.push(" AND o.order_status = ").push_bind(status);
    }
}

fn into_list_item(row: OrderListRow) -> Result<OrderListItem, RepositoryError> {
    let (order, customer) = row.inner.split()?;
    Ok(OrderListItem {
        order,
        customer,
        item_count: row.item_count,
    })
}
