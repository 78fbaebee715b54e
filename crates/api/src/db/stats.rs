//! Read-only aggregates for the store report.

use rust_decimal::Decimal;
use sqlx::PgPool;

use etic_core::stats::ProductSales;
use etic_core::{PaymentStatus, ProductId, StoreId};

use super::RepositoryError;
use crate::models::stats::StoreTotals;

#[derive(Debug, sqlx::FromRow)]
struct TotalsRow {
    total_sales: Decimal,
    total_orders: i64,
    total_customers: i64,
    total_products: i64,
    active_products: i64,
}

/// Repository for store statistics.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Headline counts and sales for a store.
    ///
    /// Sales sum the totals of orders whose payment status counts as a sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self, store: StoreId) -> Result<StoreTotals, RepositoryError> {
        let row: TotalsRow = sqlx::query_as(
            r"
            SELECT
                (SELECT COALESCE(SUM(total), 0) FROM orders
                    WHERE store_id = $1 AND payment_status = ANY($2)) AS total_sales,
                (SELECT COUNT(*) FROM orders WHERE store_id = $1) AS total_orders,
                (SELECT COUNT(*) FROM customers WHERE store_id = $1) AS total_customers,
                (SELECT COUNT(*) FROM products WHERE store_id = $1) AS total_products,
                (SELECT COUNT(*) FROM products WHERE store_id = $1 AND status = 'ACTIVE')
                    AS active_products
            ",
        )
        .bind(store)
        .bind(PaymentStatus::SALES.to_vec())
        .fetch_one(self.pool)
        .await?;

        Ok(StoreTotals {
            total_sales: row.total_sales,
            total_orders: row.total_orders,
            total_customers: row.total_customers,
            total_products: row.total_products,
            active_products: row.active_products,
        })
    }

    /// Quantity sold per product across all of a store's orders.
    ///
    /// Lines whose product link is gone are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_sales(&self, store: StoreId) -> Result<Vec<ProductSales>, RepositoryError> {
        let rows: Vec<(ProductId, i64)> = sqlx::query_as(
            r"
            SELECT i.product_id, SUM(i.quantity)::BIGINT AS quantity
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE o.store_id = $1 AND i.product_id IS NOT NULL
            GROUP BY i.product_id
            ",
        )
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, quantity)| ProductSales {
                product_id,
                quantity,
            })
            .collect())
    }
}
