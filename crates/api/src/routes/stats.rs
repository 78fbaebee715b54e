//! On-demand store report.

use std::collections::HashMap;

use axum::extract::State;

use etic_core::stats::{RECENT_ORDERS_LIMIT, TOP_PRODUCTS_LIMIT, rank_top_products};

use crate::db::{OrderRepository, ProductRepository, StatsRepository};
use crate::models::stats::{StoreStats, TopProduct};
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Staff, StoreAccess};
use crate::state::AppState;

/// Totals, the five newest orders and the five best sellers.
///
/// `GET /api/v1/stores/{storeId}/stats`
pub async fn show(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
) -> ApiResult<StoreStats> {
    let store_id = access.store_id();

    let stats = StatsRepository::new(state.pool());
    let totals = stats.totals(store_id).await?;
    let sales = stats.product_sales(store_id).await?;

    let ranked = rank_top_products(
        sales.into_iter().map(|s| (s.product_id, s.quantity)),
        TOP_PRODUCTS_LIMIT,
    );
    let ids: Vec<_> = ranked.iter().map(|r| r.product_id).collect();
    let mut summaries: HashMap<_, _> = ProductRepository::new(state.pool())
        .summaries(store_id, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let top_products = ranked
        .into_iter()
        .filter_map(|r| {
            summaries.remove(&r.product_id).map(|product| TopProduct {
                product,
                quantity_sold: r.quantity,
            })
        })
        .collect();

    let recent_orders = OrderRepository::new(state.pool())
        .recent(store_id, RECENT_ORDERS_LIMIT)
        .await?;

    Ok(ApiResponse::ok(StoreStats {
        stats: totals,
        recent_orders,
        top_products,
    }))
}
