//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use etic_core::{
    CurrencyCode, CustomerId, Email, FulfillmentStatus, OrderId, OrderItemId, OrderStatus,
    PaymentStatus, ProductId, StoreId,
};

/// Address captured on an order at creation time.
///
/// Stored as JSON on the order row; later edits to customer addresses never
/// reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 255))]
    pub address2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub province: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub zip: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

/// An order header with derived totals and its three status axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    pub order_number: String,
    pub customer_id: Option<CustomerId>,
    pub email: Email,
    pub phone: Option<String>,
    pub billing_address: AddressSnapshot,
    pub shipping_address: AddressSnapshot,
    pub currency: CurrencyCode,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// Cleared when the product is deleted; the snapshot stays.
    pub product_id: Option<ProductId>,
    pub title: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
    pub position: i32,
}

/// Customer fields shown on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    pub id: CustomerId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// An order in list views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListItem {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<CustomerRef>,
    pub item_count: i64,
}

/// An order with its customer and items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<CustomerRef>,
    pub items: Vec<OrderItem>,
}
