//! Store membership management.
//!
//! Admins manage staff and admins; only owners grant, change or revoke the
//! owner role. A store never loses its last owner.

use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use etic_core::{StoreId, StoreRole, UserId};

use crate::db::{StoreRepository, UserRepository};
use crate::error::{ApiError, Entity, missing};
use crate::extract::{ApiPath, ValidJson};
use crate::models::Message;
use crate::models::store::Member;
use crate::response::{ApiResponse, ApiResult};
use crate::services::access::{Admin, Staff, StoreAccess, ensure_can_manage};
use crate::state::AppState;
use crate::validation::{self, parse_email};

/// Add-member request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[validate(custom(function = "validation::email"))]
    pub email: String,
    pub role: StoreRole,
}

/// Role change request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub role: StoreRole,
}

/// Members of a store.
///
/// `GET /api/v1/stores/{storeId}/members`
pub async fn list(
    State(state): State<AppState>,
    access: StoreAccess<Staff>,
) -> ApiResult<Vec<Member>> {
    let store_id = access.store_id();

    let members = StoreRepository::new(state.pool()).members(store_id).await?;
    Ok(ApiResponse::ok(members))
}

/// Add an existing user to the store.
///
/// `POST /api/v1/stores/{storeId}/members`
pub async fn add(
    State(state): State<AppState>,
    access: StoreAccess<Admin>,
    ValidJson(body): ValidJson<AddMemberRequest>,
) -> ApiResult<Member> {
    let actor = access.membership;
    let store_id = access.store_id();
    ensure_can_manage(&actor, body.role)?;

    let email = parse_email(&body.email, "email")?;
    let target = UserRepository::new(state.pool())
        .get_by_email(&email)
        .await?
        .ok_or(ApiError::NotFound(Entity::User))?;

    let member = StoreRepository::new(state.pool())
        .add_member(store_id, target.id, body.role)
        .await?;

    tracing::info!(
        store_id = %store_id,
        user_id = %target.id,
        role = %body.role,
        "Member added"
    );
    Ok(ApiResponse::created(member))
}

/// Change a member's role.
///
/// `PATCH /api/v1/stores/{storeId}/members/{userId}`
pub async fn update(
    State(state): State<AppState>,
    access: StoreAccess<Admin>,
    ApiPath((_, member_id)): ApiPath<(StoreId, UserId)>,
    ValidJson(body): ValidJson<UpdateMemberRequest>,
) -> ApiResult<Member> {
    let store_id = access.store_id();
    let actor = access.membership;

    let stores = StoreRepository::new(state.pool());
    let current = stores
        .membership(store_id, member_id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Member))?;
    ensure_can_manage(&actor, current.role)?;
    ensure_can_manage(&actor, body.role)?;

    let member = stores
        .update_member_role(store_id, member_id, body.role)
        .await
        .map_err(missing(Entity::Member))?;

    tracing::info!(
        store_id = %store_id,
        user_id = %member_id,
        role = %body.role,
        "Member role changed"
    );
    Ok(ApiResponse::ok(member))
}

/// Remove a member from the store.
///
/// `DELETE /api/v1/stores/{storeId}/members/{userId}`
pub async fn remove(
    State(state): State<AppState>,
    access: StoreAccess<Admin>,
    ApiPath((_, member_id)): ApiPath<(StoreId, UserId)>,
) -> ApiResult<Message> {
    let store_id = access.store_id();
    let actor = access.membership;

    let stores = StoreRepository::new(state.pool());
    let current = stores
        .membership(store_id, member_id)
        .await?
        .ok_or(ApiError::NotFound(Entity::Member))?;
    ensure_can_manage(&actor, current.role)?;

    stores
        .remove_member(store_id, member_id)
        .await
        .map_err(missing(Entity::Member))?;

    tracing::info!(store_id = %store_id, user_id = %member_id, "Member removed");
    Ok(ApiResponse::message("Member removed successfully"))
}
