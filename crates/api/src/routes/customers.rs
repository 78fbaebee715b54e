//! Customer records and their address book.

use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use etic_core::{AddressId, CustomerId, PageRequest, StoreId};

use crate::db::customers::{CustomerChanges, NewAddress, NewCustomer};
use crate::db::{CustomerRepository, OrderRepository};
use crate::error::{ApiError, Entity, missing};
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::models::Message;
use crate::models::customer::{Customer, CustomerAddress, CustomerDetail, CustomerListItem};
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Staff, StoreAccess};
use crate::state::AppState;
use crate::validation::{self, dedup_tags, double_option, parse_email};

/// Orders embedded in a customer detail response.
const CUSTOMER_RECENT_ORDERS: i64 = 10;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[validate(length(max = 200))]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[validate(custom(function = "validation::email"))]
    pub email: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub accepts_marketing: Option<bool>,
    #[serde(default)]
    #[validate(custom(function = "validation::tags"))]
    pub tags: Vec<String>,
    #[validate(length(max = 5000))]
    pub note: Option<String>,
}

/// Customer update. Absent fields are untouched; `null` clears.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(custom(function = "validation::email"))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 50))]
    pub phone: Option<Option<String>>,
    pub accepts_marketing: Option<bool>,
    #[validate(custom(function = "validation::tags"))]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 5000))]
    pub note: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address1: String,
    #[validate(length(max = 255))]
    pub address2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub province: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub zip: String,
    #[validate(length(min = 2, max = 100))]
    pub country: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// `POST /api/v1/stores/{storeId}/customers`
pub async fn create(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidJson(body): ValidJson<CreateCustomerRequest>,
) -> ApiResult<Customer> {
    let store_id = access.store_id();

    let customer = CustomerRepository::new(state.pool())
        .create(
            store_id,
            NewCustomer {
                email: parse_email(&body.email, "email")?,
                first_name: body.first_name,
                last_name: body.last_name,
                phone: body.phone,
                accepts_marketing: body.accepts_marketing.unwrap_or(false),
                tags: dedup_tags(body.tags),
                note: body.note,
            },
        )
        .await?;

    Ok(ApiResponse::created(customer))
}

/// `GET /api/v1/stores/{storeId}/customers`
pub async fn list(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ValidQuery(query): ValidQuery<CustomerListQuery>,
) -> ApiResult<Vec<CustomerListItem>> {
    let store_id = access.store_id();

    let page = PageRequest::new(query.page, query.limit);
    let (customers, meta) = CustomerRepository::new(state.pool())
        .list(store_id, query.search.as_deref(), page)
        .await?;

    Ok(ApiResponse::paginated(customers, meta))
}

/// Customer with addresses and recent orders.
///
/// `GET /api/v1/stores/{storeId}/customers/{id}`
pub async fn show(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CustomerId)>,
) -> ApiResult<CustomerDetail> {
    let store_id = access.store_id();

    let customers = CustomerRepository::new(state.pool());
    let customer = customers
        .get(store_id, id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Customer))?;
    let addresses = customers.addresses(id).await?;
    let orders = OrderRepository::new(state.pool())
        .list_for_customer(store_id, id, CUSTOMER_RECENT_ORDERS)
        .await?;

    Ok(ApiResponse::ok(CustomerDetail {
        customer,
        addresses,
        orders,
    }))
}

/// `PATCH /api/v1/stores/{storeId}/customers/{id}`
pub async fn update(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CustomerId)>,
    ValidJson(body): ValidJson<UpdateCustomerRequest>,
) -> ApiResult<Customer> {
    let store_id = access.store_id();

    let changes = CustomerChanges {
        email: body
            .email
            .as_deref()
            .map(|e| parse_email(e, "email"))
            .transpose()?,
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        accepts_marketing: body.accepts_marketing,
        tags: body.tags.map(dedup_tags),
        note: body.note,
    };

    let customer = CustomerRepository::new(state.pool())
        .update(store_id, id, changes)
        .await
        .map_err(missing(Entity::Customer))?;

    Ok(ApiResponse::ok(customer))
}

/// Add an address. The first address always becomes the default.
///
/// `POST /api/v1/stores/{storeId}/customers/{id}/addresses`
pub async fn add_address(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id)): ApiPath<(StoreId, CustomerId)>,
    ValidJson(body): ValidJson<CreateAddressRequest>,
) -> ApiResult<CustomerAddress> {
    let store_id = access.store_id();

    let address = CustomerRepository::new(state.pool())
        .add_address(
            store_id,
            id,
            NewAddress {
                first_name: body.first_name,
                last_name: body.last_name,
                company: body.company,
                address1: body.address1,
                address2: body.address2,
                city: body.city,
                province: body.province,
                zip: body.zip,
                country: body.country,
                phone: body.phone,
                is_default: body.is_default,
            },
        )
        .await
        .map_err(missing(Entity::Customer))?;

    Ok(ApiResponse::created(address))
}

/// Remove an address, promoting another one if it was the default.
///
/// `DELETE /api/v1/stores/{storeId}/customers/{id}/addresses/{addressId}`
pub async fn delete_address(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
    ApiPath((_, id, address_id)): ApiPath<(StoreId, CustomerId, AddressId)>,
) -> ApiResult<Message> {
    let store_id = access.store_id();

    let customers = CustomerRepository::new(state.pool());
    if customers.get(store_id, id).await?.is_none() {
        return Err(ApiError::NotFound(Entity::Customer));
    }

    customers
        .delete_address(store_id, id, address_id)
        .await
        .map_err(missing(Entity::Address))?;

    Ok(ApiResponse::message("Address deleted successfully"))
}
