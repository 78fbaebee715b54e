//! Store and membership domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use etic_core::{CurrencyCode, Email, StoreId, StorePlan, StoreRole, StoreStatus, UserId};

/// A tenant store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
    pub plan: StorePlan,
    pub status: StoreStatus,
    pub default_currency: CurrencyCode,
    pub default_language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row counts shown with a store.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    pub products: i64,
    pub orders: i64,
    pub customers: i64,
    pub categories: i64,
}

/// A store in the caller's store list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    #[serde(flatten)]
    pub store: Store,
    /// The caller's role in this store.
    pub role: StoreRole,
    pub counts: StoreCounts,
}

/// A store with its members.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetail {
    #[serde(flatten)]
    pub store: Store,
    pub members: Vec<Member>,
    pub counts: StoreCounts,
}

/// A user's membership in a store, with user details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: StoreRole,
    pub joined_at: DateTime<Utc>,
}

/// The bare (store, user, role) triple checked by the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub store_id: StoreId,
    pub user_id: UserId,
    pub role: StoreRole,
}
