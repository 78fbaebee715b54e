//! Account registration, login and the current user.

use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use crate::db::UserRepository;
use crate::error::{ApiError, Entity};
use crate::extract::ValidJson;
use crate::middleware::AuthUser;
use crate::models::user::{AuthSession, CurrentUser};
use crate::response::{ApiResponse, ApiResult};
use crate::services::auth::AuthService;
use crate::state::AppState;
use crate::validation::{self, parse_email};

/// Registration request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(custom(function = "validation::email"))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(custom(function = "validation::email"))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Create an account.
///
/// `POST /api/v1/auth/register`
pub async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> ApiResult<AuthSession> {
    let email = parse_email(&body.email, "email")?;
    let session = AuthService::new(state.pool(), state.tokens())
        .register(&email, &body.password, body.name.as_deref())
        .await?;

    Ok(ApiResponse::created(session))
}

/// Exchange credentials for a token.
///
/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> ApiResult<AuthSession> {
    let email = parse_email(&body.email, "email")?;
    let session = AuthService::new(state.pool(), state.tokens())
        .login(&email, &body.password)
        .await?;

    tracing::info!(user_id = %session.user.id, "User logged in");
    Ok(ApiResponse::ok(session))
}

/// The caller's profile and store memberships.
///
/// `GET /api/v1/auth/me`
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<CurrentUser> {
    let users = UserRepository::new(state.pool());

    let profile = users
        .get_by_id(user.id)
        .await?
        .ok_or(ApiError::NotFound(Entity::User))?;
    let stores = users.memberships(user.id).await?;

    Ok(ApiResponse::ok(CurrentUser {
        user: profile,
        stores,
    }))
}
