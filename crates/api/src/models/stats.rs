//! Store report types.

use rust_decimal::Decimal;
use serde::Serialize;

use super::catalog::ProductSummary;
use super::order::OrderDetail;

/// Headline numbers for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTotals {
    /// Sum of order totals with payment status PAID or PARTIALLY_PAID.
    pub total_sales: Decimal,
    pub total_orders: i64,
    pub total_customers: i64,
    pub total_products: i64,
    pub active_products: i64,
}

/// A best-selling product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    #[serde(flatten)]
    pub product: ProductSummary,
    pub quantity_sold: i64,
}

/// Response body of `GET /stores/{storeId}/stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub stats: StoreTotals,
    pub recent_orders: Vec<OrderDetail>,
    pub top_products: Vec<TopProduct>,
}
