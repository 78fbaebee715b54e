//! Store access gate.
//!
//! Every store-scoped handler takes a [`StoreAccess`] extractor, which runs
//! [`authorize`] against the `{storeId}` path parameter before the request
//! body is read. A caller with no membership, or one whose role is below the
//! required minimum, gets `FORBIDDEN` whatever the body holds; the store's
//! existence is not revealed.

use std::marker::PhantomData;

use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::request::Parts;
use sqlx::PgPool;

use etic_core::{StoreId, StoreRole};

use crate::db::StoreRepository;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::store::Membership;
use crate::state::AppState;

/// Path parameter naming the store on every store-scoped route.
const STORE_PARAM: &str = "storeId";

/// Minimum role a [`StoreAccess`] extractor demands.
pub trait RequiredRole: Send + Sync {
    const ROLE: StoreRole;
}

/// Any member of the store.
#[derive(Debug)]
pub struct Staff;

/// Store admins and owners.
#[derive(Debug)]
pub struct Admin;

/// Store owners only.
#[derive(Debug)]
pub struct Owner;

impl RequiredRole for Staff {
    const ROLE: StoreRole = StoreRole::Staff;
}

impl RequiredRole for Admin {
    const ROLE: StoreRole = StoreRole::Admin;
}

impl RequiredRole for Owner {
    const ROLE: StoreRole = StoreRole::Owner;
}

/// An authenticated caller holding at least `R` in the store named by the
/// path.
///
/// Place it before any body extractor so outsiders are refused before
/// their payload is parsed or validated.
#[derive(Debug)]
pub struct StoreAccess<R> {
    pub user: AuthUser,
    pub membership: Membership,
    role: PhantomData<R>,
}

impl<R> StoreAccess<R> {
    #[must_use]
    pub const fn store_id(&self) -> StoreId {
        self.membership.store_id
    }
}

impl<R: RequiredRole> FromRequestParts<AppState> for StoreAccess<R> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let store = store_param(parts, state).await?;
        let membership = authorize(state.pool(), &user, store, R::ROLE).await?;

        Ok(Self {
            user,
            membership,
            role: PhantomData,
        })
    }
}

async fn store_param(parts: &mut Parts, state: &AppState) -> Result<StoreId, ApiError> {
    let params = RawPathParams::from_request_parts(parts, state)
        .await
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let raw = params
        .iter()
        .find_map(|(name, value)| (name == STORE_PARAM).then_some(value))
        .ok_or(ApiError::RouteNotFound)?;

    parse_store_id(raw)
}

fn parse_store_id(raw: &str) -> Result<StoreId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid URL: invalid store id `{raw}`")))
}

/// Check that `caller` holds at least `minimum` in `store`.
///
/// # Errors
///
/// Returns `ApiError::Forbidden` if the caller lacks the role.
/// Returns `ApiError::Database` if the lookup fails.
pub async fn authorize(
    pool: &PgPool,
    caller: &AuthUser,
    store: StoreId,
    minimum: StoreRole,
) -> Result<Membership, ApiError> {
    let membership = StoreRepository::new(pool)
        .membership(store, caller.id)
        .await?;

    check(membership, minimum).inspect_err(|_| {
        tracing::debug!(
            user_id = %caller.id,
            store_id = %store,
            required = %minimum,
            "Store access denied"
        );
    })
}

fn check(membership: Option<Membership>, minimum: StoreRole) -> Result<Membership, ApiError> {
    match membership {
        Some(m) if m.role.satisfies(minimum) => Ok(m),
        _ => Err(ApiError::Forbidden),
    }
}

/// Check that an actor may grant or revoke `role`, or change a member who
/// currently holds it. Owner-level changes need an owner.
///
/// # Errors
///
/// Returns `ApiError::Forbidden` if the actor is not an owner and `role` is
/// `Owner`.
pub fn ensure_can_manage(actor: &Membership, role: StoreRole) -> Result<(), ApiError> {
    if role == StoreRole::Owner && actor.role != StoreRole::Owner {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
