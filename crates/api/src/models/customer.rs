//! Customer domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use etic_core::{AddressId, CustomerId, Email, StoreId};

use super::order::OrderListItem;

/// A shopper known to one store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub store_id: StoreId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub accepts_marketing: bool,
    /// Deduplicated, in first-seen order.
    pub tags: Vec<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer in the list view, with counts computed at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListItem {
    #[serde(flatten)]
    pub customer: Customer,
    pub order_count: i64,
    pub address_count: i64,
}

/// A saved customer address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAddress {
    pub id: AddressId,
    pub customer_id: CustomerId,
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
    pub created_at: DateTime<Utc>,
}

/// A customer with addresses and recent orders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub addresses: Vec<CustomerAddress>,
    pub orders: Vec<OrderListItem>,
}
