//! Bearer token authentication.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use etic_core::{Email, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, taken from a verified bearer token.
///
/// Handlers that take this extractor reject unauthenticated requests with
/// `401` before running.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Email,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::Unauthorized)?;

        let token = bearer_token(header.to_str().ok())
            .ok_or_else(|| ApiError::InvalidToken("malformed authorization header".to_owned()))?;

        let claims = state.tokens().verify(token)?;

        sentry::configure_scope(|scope| {
            scope.set_user(Some(sentry::User {
                id: Some(claims.sub.to_string()),
                ..Default::default()
            }));
        });

        Ok(Self {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// Extract the token from a `Bearer <token>` header value.
fn bearer_token(value: Option<&str>) -> Option<&str> {
    let (scheme, token) = value?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("abc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
