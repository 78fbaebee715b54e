//! Ranking helpers for store reports.

use std::collections::HashMap;

use crate::ProductId;

/// Number of products shown in the best-seller list.
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Number of orders shown in the recent-orders list.
pub const RECENT_ORDERS_LIMIT: i64 = 5;

/// Quantity sold for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Rank products by quantity sold.
///
/// Input rows may repeat a product (one row per order item or per partial
/// aggregate); quantities are summed per product. Output is sorted by total
/// quantity descending, ties broken by product id ascending, and truncated to
/// `limit` entries.
#[must_use]
pub fn rank_top_products<I>(rows: I, limit: usize) -> Vec<ProductSales>
where
    I: IntoIterator<Item = (ProductId, i64)>,
{
    let mut totals: HashMap<ProductId, i64> = HashMap::new();
    for (product_id, quantity) in rows {
        let entry = totals.entry(product_id).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    let mut ranked: Vec<ProductSales> = totals
        .into_iter()
        .map(|(product_id, quantity)| ProductSales {
            product_id,
            quantity,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}
