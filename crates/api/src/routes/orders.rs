//! Order creation, listing and status updates.

use axum::extract::State;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use etic_core::{
    Adjustments, CurrencyCode, CustomerId, FulfillmentStatus, LineAmount, OrderId, OrderStatus,
    OrderTotals, PageRequest, PaymentStatus, ProductId, StoreId, round_money,
};

use crate::db::orders::{NewOrder, NewOrderItem, StatusChanges};
use crate::db::{CustomerRepository, OrderRepository, ProductRepository, StoreRepository};
use crate::error::{ApiError, Entity, missing};
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::models::order::{AddressSnapshot, Order, OrderDetail, OrderListItem};
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Staff, StoreAccess};
use crate::state::AppState;
use crate::validation::{self, MAX_MONEY, dedup_ids, parse_email};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
}

/// One requested line. `productId` is optional; without it the line is ad hoc.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemRequest {
    pub product_id: Option<ProductId>,
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(max = 100))]
    pub sku: Option<String>,
    #[validate(range(min = 1, max = 100_000))]
    pub quantity: u32,
    #[validate(custom(function = "validation::positive_money"))]
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: Option<CustomerId>,
    #[validate(custom(function = "validation::email"))]
    pub email: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(nested)]
    pub billing_address: AddressSnapshot,
    #[validate(nested)]
    pub shipping_address: AddressSnapshot,
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<CreateOrderItemRequest>,
    pub currency: Option<CurrencyCode>,
    #[validate(custom(function = "validation::non_negative_money"))]
    pub discount: Option<Decimal>,
    #[validate(custom(function = "validation::non_negative_money"))]
    pub tax: Option<Decimal>,
    #[validate(custom(function = "validation::non_negative_money"))]
    pub shipping: Option<Decimal>,
    #[validate(length(max = 5000))]
    pub note: Option<String>,
}

/// Status update body. Provided axes overwrite; absent ones are kept.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl UpdateStatusRequest {
    const fn is_empty(&self) -> bool {
        self.order_status.is_none()
            && self.payment_status.is_none()
            && self.fulfillment_status.is_none()
    }
}

/// Check that the referenced customer and products belong to the store.
async fn check_references(
    state: &AppState,
    store_id: StoreId,
    body: &CreateOrderRequest,
) -> Result<(), ApiError> {
    if let Some(customer_id) = body.customer_id {
        CustomerRepository::new(state.pool())
            .get(store_id, customer_id)
            .await?
            .ok_or(ApiError::NotFound(Entity::Customer))?;
    }

    let product_ids: Vec<ProductId> = body.items.iter().filter_map(|i| i.product_id).collect();
    let unknown = ProductRepository::new(state.pool())
        .missing_ids(store_id, &dedup_ids(&product_ids))
        .await?;
    if !unknown.is_empty() {
        return Err(ApiError::NotFound(Entity::Product));
    }

    Ok(())
}

/// Snapshot the requested lines and derive the order totals.
fn price_order(body: &CreateOrderRequest) -> Result<(Vec<NewOrderItem>, OrderTotals), ApiError> {
    let adjustments = Adjustments {
        discount: body.discount.unwrap_or(Decimal::ZERO),
        tax: body.tax.unwrap_or(Decimal::ZERO),
        shipping: body.shipping.unwrap_or(Decimal::ZERO),
    };

    let lines: Vec<LineAmount> = body
        .items
        .iter()
        .map(|item| LineAmount {
            price: round_money(item.price),
            quantity: item.quantity,
        })
        .collect();

    let totals = OrderTotals::compute(lines.iter().copied(), adjustments)
        .map_err(|e| ApiError::invalid_field(e.field(), e.to_string()))?;
    if totals.subtotal > MAX_MONEY {
        return Err(ApiError::invalid_field("items", "order subtotal is too large"));
    }
    if totals.total > MAX_MONEY {
        return Err(ApiError::invalid_field("total", "order total is too large"));
    }

    let items = body
        .items
        .iter()
        .zip(&lines)
        .map(|(item, line)| {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| ApiError::invalid_field("items", "quantity is too large"))?;
            let total = line
                .total()
                .map_err(|e| ApiError::invalid_field(e.field(), e.to_string()))?;
            if total > MAX_MONEY {
                return Err(ApiError::invalid_field("items", "line total is too large"));
            }
            Ok(NewOrderItem {
                product_id: item.product_id,
                title: item.title.trim().to_owned(),
                sku: item.sku.clone(),
                quantity,
                price: line.price,
                total,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok((items, totals))
}

/// Place an order.
///
/// Totals are always derived from the lines; clients never send them.
///
/// `POST /api/v1/stores/{storeId}/orders`
pub async fn create(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidJson(body): ValidJson<CreateOrderRequest>,
) -> ApiResult<OrderDetail> {
    let store_id = access.store_id();

    let email = parse_email(&body.email, "email")?;
    check_references(&state, store_id, &body).await?;
    let (items, totals) = price_order(&body)?;

    let currency = match body.currency {
        Some(currency) => currency,
        None => StoreRepository::new(state.pool())
            .get(store_id)
            .await?
            .ok_or(ApiError::NotFound(Entity::Store))?
            .default_currency,
    };

    let order = OrderRepository::new(state.pool())
        .create(
            store_id,
            NewOrder {
                customer_id: body.customer_id,
                email,
                phone: body.phone,
                billing_address: body.billing_address,
                shipping_address: body.shipping_address,
                currency,
                totals,
                items,
                note: body.note,
            },
        )
        .await
        .map_err(missing(Entity::Store))?;

    tracing::info!(
        store_id = %store_id,
        order_number = %order.order.order_number,
        total = %order.order.total,
        "Order created"
    );

    Ok(ApiResponse::created(order))
}

/// `GET /api/v1/stores/{storeId}/orders`
pub async fn list(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidQuery(query): ValidQuery<OrderListQuery>,
) -> ApiResult<Vec<OrderListItem>> {
    let store_id = access.store_id();

    let page = PageRequest::new(query.page, query.limit);
    let (orders, meta) = OrderRepository::new(state.pool())
        .list(store_id, query.status, page)
        .await?;

    Ok(ApiResponse::paginated(orders, meta))
}

/// `GET /api/v1/stores/{storeId}/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, OrderId)>,
) -> ApiResult<OrderDetail> {
    let store_id = access.store_id();

    let order = OrderRepository::new(state.pool())
        .get(store_id, id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Order))?;

    Ok(ApiResponse::ok(order))
}

/// Overwrite any of the three status axes.
///
/// Any status may follow any other. With `expectedUpdatedAt` the write only
/// applies if the order is unchanged since it was read.
///
/// `PATCH /api/v1/stores/{storeId}/orders/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, OrderId)>,
    ValidJson(body): ValidJson<UpdateStatusRequest>,
) -> ApiResult<Order> {
    let store_id = access.store_id();

    if body.is_empty() {
        return Err(ApiError::invalid_field(
            "status",
            "at least one of orderStatus, paymentStatus or fulfillmentStatus is required",
        ));
    }

    let order = OrderRepository::new(state.pool())
        .update_status(
            store_id,
            id,
            StatusChanges {
                order_status: body.order_status,
                payment_status: body.payment_status,
                fulfillment_status: body.fulfillment_status,
                expected_updated_at: body.expected_updated_at,
            },
        )
        .await
        .map_err(missing(Entity::Order))?;

    tracing::info!(
        store_id = %store_id,
        order_id = %id,
        order_status = %order.order_status,
        payment_status = %order.payment_status,
        fulfillment_status = %order.fulfillment_status,
        "Order status updated"
    );

    Ok(ApiResponse::ok(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> AddressSnapshot {
        AddressSnapshot {
            first_name: "Ayşe".into(),
            last_name: "Yılmaz".into(),
            company: None,
            address1: "Bağdat Cd. 1".into(),
            address2: None,
            city: "İstanbul".into(),
            province: None,
            zip: "34710".into(),
            country: "TR".into(),
            phone: None,
        }
    }

    fn request(items: Vec<CreateOrderItemRequest>) -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: None,
            email: "buyer@example.com".into(),
            phone: None,
            billing_address: address(),
            shipping_address: address(),
            items,
            currency: None,
            discount: None,
            tax: None,
            shipping: None,
            note: None,
        }
    }

    fn item(price: &str, quantity: u32) -> CreateOrderItemRequest {
        CreateOrderItemRequest {
            product_id: None,
            title: "Telefon".into(),
            sku: None,
            quantity,
            price: price.parse().unwrap(),
        }
    }

    #[test]
    fn test_price_order_derives_totals() {
        let mut body = request(vec![item("45000.00", 2)]);
        let (items, totals) = price_order(&body).unwrap();
        assert_eq!(totals.subtotal, "90000.00".parse::<Decimal>().unwrap());
        assert_eq!(totals.total, totals.subtotal);
        assert_eq!(items[0].total, totals.subtotal);

        body.discount = Some("100".parse().unwrap());
        body.tax = Some("18".parse().unwrap());
        body.shipping = Some("50".parse().unwrap());
        let (_, totals) = price_order(&body).unwrap();
        assert_eq!(totals.total, "89968.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_price_order_rejects_large_discount() {
        let mut body = request(vec![item("10.00", 1)]);
        body.discount = Some("11".parse().unwrap());
        let err = price_order(&body).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    fn invalid_fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => {
                errors.field_errors().keys().map(ToString::to_string).collect()
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_price_order_rejects_amounts_beyond_storage() {
        // Each field is in range, the line total is not
        let body = request(vec![item("9999999999.99", 2)]);
        assert!(body.validate().is_ok());
        assert_eq!(invalid_fields(price_order(&body).unwrap_err()), ["items"]);

        let body = request(vec![item("6000000000.00", 1), item("6000000000.00", 1)]);
        assert_eq!(invalid_fields(price_order(&body).unwrap_err()), ["items"]);

        let mut body = request(vec![item("9999999999.99", 1)]);
        body.shipping = Some("1.00".parse().unwrap());
        assert_eq!(invalid_fields(price_order(&body).unwrap_err()), ["total"]);

        body.shipping = None;
        assert!(price_order(&body).is_ok());
    }

    #[test]
    fn test_empty_items_fail_validation() {
        let body = request(Vec::new());
        let errors = body.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn test_nested_item_errors_are_reported() {
        let body = request(vec![item("10.00", 1), item("0", 0)]);
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_status_request_needs_an_axis() {
        let body: UpdateStatusRequest =
            serde_json::from_str(r#"{"expectedUpdatedAt":"2026-01-01T00:00:00Z"}"#).unwrap();
        assert!(body.is_empty());

        let body: UpdateStatusRequest =
            serde_json::from_str(r#"{"fulfillmentStatus":"FULFILLED"}"#).unwrap();
        assert!(!body.is_empty());
        assert_eq!(body.fulfillment_status, Some(FulfillmentStatus::Fulfilled));
    }
}
