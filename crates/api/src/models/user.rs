//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use etic_core::{Email, StoreId, StorePlan, StoreRole, StoreStatus, UserId};

/// A platform account (domain type).
///
/// Users are global; access to a store comes from a membership.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Display name.
    pub name: Option<String>,
    /// Last successful password login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Response body of register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Store fields shown next to a membership.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRef {
    pub id: StoreId,
    pub name: String,
    pub slug: String,
    pub plan: StorePlan,
    pub status: StoreStatus,
}

/// One of the caller's memberships.
#[derive(Debug, Clone, Serialize)]
pub struct UserMembership {
    pub role: StoreRole,
    pub store: StoreRef,
}

/// Response body of `GET /auth/me`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: User,
    pub stores: Vec<UserMembership>,
}
