//! Status enums for stores, products and orders.
//!
//! Every enum serializes as `SCREAMING_SNAKE_CASE` on the wire and maps to a
//! PostgreSQL enum type of the same spelling (with the `postgres` feature).
//!
//! The three order axes are independent. Any value may be set from any other;
//! no transition graph is enforced.

use serde::{Deserialize, Serialize};

/// Implements `as_str` and `Display` from a variant-to-wire-name table.
macro_rules! wire_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Wire name of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl ::core::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Overall progress of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

wire_names!(OrderStatus {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

/// Payment progress of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    PartiallyPaid,
    PartiallyRefunded,
    Refunded,
    Failed,
}

wire_names!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    PartiallyPaid => "PARTIALLY_PAID",
    PartiallyRefunded => "PARTIALLY_REFUNDED",
    Refunded => "REFUNDED",
    Failed => "FAILED",
});

impl PaymentStatus {
    /// Payment states whose order totals count toward store sales.
    pub const SALES: [Self; 2] = [Self::Paid, Self::PartiallyPaid];

    /// Whether an order in this payment state counts as a sale.
    #[must_use]
    pub const fn counts_as_sale(self) -> bool {
        matches!(self, Self::Paid | Self::PartiallyPaid)
    }
}

/// Fulfillment progress of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "fulfillment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Cancelled,
}

wire_names!(FulfillmentStatus {
    Unfulfilled => "UNFULFILLED",
    PartiallyFulfilled => "PARTIALLY_FULFILLED",
    Fulfilled => "FULFILLED",
    Cancelled => "CANCELLED",
});

/// Catalog visibility of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

wire_names!(ProductStatus {
    Draft => "DRAFT",
    Active => "ACTIVE",
    Archived => "ARCHIVED",
});

/// Lifecycle state of a tenant store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    #[default]
    Active,
    Suspended,
}

wire_names!(StoreStatus {
    Active => "ACTIVE",
    Suspended => "SUSPENDED",
});

/// Subscription tier of a tenant store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store_plan", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorePlan {
    #[default]
    Free,
    Starter,
    Professional,
    Enterprise,
}

wire_names!(StorePlan {
    Free => "FREE",
    Starter => "STARTER",
    Professional => "PROFESSIONAL",
    Enterprise => "ENTERPRISE",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
        assert_eq!(FulfillmentStatus::default(), FulfillmentStatus::Unfulfilled);
        assert_eq!(ProductStatus::default(), ProductStatus::Draft);
        assert_eq!(StorePlan::default(), StorePlan::Free);
    }

    #[test]
    fn test_wire_names_match_serde() {
        let json = serde_json::to_string(&PaymentStatus::PartiallyRefunded).unwrap();
        assert_eq!(json, format!("\"{}\"", PaymentStatus::PartiallyRefunded));

        let parsed: FulfillmentStatus = serde_json::from_str("\"PARTIALLY_FULFILLED\"").unwrap();
        assert_eq!(parsed, FulfillmentStatus::PartiallyFulfilled);
    }

    #[test]
    fn test_rejects_unknown_status() {
        assert!(serde_json::from_str::<OrderStatus>("\"LOST\"").is_err());
        assert!(serde_json::from_str::<OrderStatus>("\"pending\"").is_err());
    }

    #[test]
    fn test_sales_statuses() {
        assert!(PaymentStatus::Paid.counts_as_sale());
        assert!(PaymentStatus::PartiallyPaid.counts_as_sale());
        assert!(!PaymentStatus::PartiallyRefunded.counts_as_sale());
        assert!(!PaymentStatus::Pending.counts_as_sale());
        assert!(PaymentStatus::SALES.iter().all(|s| s.counts_as_sale()));
    }
}
