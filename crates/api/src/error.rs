//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, ApiError>`. Errors render as the failure
//! envelope `{ "success": false, "error": { code, message, details? } }`.
//! Server-side failures are captured to Sentry before responding.

use std::borrow::Cow;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Resource kinds that can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Store,
    User,
    Member,
    Category,
    Product,
    Collection,
    Customer,
    Address,
    Order,
}

impl Entity {
    /// Error code for a missing resource of this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Store => "STORE_NOT_FOUND",
            Self::User => "USER_NOT_FOUND",
            Self::Member => "MEMBER_NOT_FOUND",
            Self::Category => "CATEGORY_NOT_FOUND",
            Self::Product => "PRODUCT_NOT_FOUND",
            Self::Collection => "COLLECTION_NOT_FOUND",
            Self::Customer => "CUSTOMER_NOT_FOUND",
            Self::Address => "ADDRESS_NOT_FOUND",
            Self::Order => "ORDER_NOT_FOUND",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Store => "Store",
            Self::User => "User",
            Self::Member => "Member",
            Self::Category => "Category",
            Self::Product => "Product",
            Self::Collection => "Collection",
            Self::Customer => "Customer",
            Self::Address => "Address",
            Self::Order => "Order",
        }
    }
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or query failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Request body or query could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No bearer token was supplied.
    #[error("authentication required")]
    Unauthorized,

    /// The bearer token is malformed, forged or expired.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Email or password is wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but not allowed to act on this store.
    #[error("forbidden")]
    Forbidden,

    /// A tenant-scoped resource does not exist (or belongs to another store).
    #[error("{} not found", .0.label())]
    NotFound(Entity),

    /// Uniqueness clash or a rule that depends on current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No route matched the request path.
    #[error("route not found")]
    RouteNotFound,

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// A validation error on a single field.
    #[must_use]
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        let mut error = ValidationError::new("invalid");
        error.message = Some(Cow::Owned(message.into()));
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        Self::Validation(errors)
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidToken(_) | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(entity) => entity.code(),
            Self::Conflict(_) => "CONFLICT",
            Self::RouteNotFound => "NOT_FOUND",
            Self::Database(_) | Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(_) => "Validation failed".to_owned(),
            Self::BadRequest(message) | Self::Conflict(message) => message.clone(),
            Self::Unauthorized => "Authentication required".to_owned(),
            Self::InvalidToken(_) => "Invalid or expired token".to_owned(),
            Self::InvalidCredentials => "Invalid email or password".to_owned(),
            Self::Forbidden => "You do not have access to this resource".to_owned(),
            Self::NotFound(entity) => format!("{} not found", entity.label()),
            Self::RouteNotFound => "Route not found".to_owned(),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::Invalid { field, message } => Self::invalid_field(field, message),
            other => Self::Database(other),
        }
    }
}

/// Map a repository error, turning `NotFound` into a missing `entity`.
///
/// ```rust,ignore
/// repo.delete(store, id).await.map_err(missing(Entity::Product))?;
/// ```
pub fn missing(entity: Entity) -> impl Fn(RepositoryError) -> ApiError {
    move |err| match err {
        RepositoryError::NotFound => ApiError::NotFound(entity),
        other => other.into(),
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::UserAlreadyExists => {
                Self::Conflict("An account with this email already exists".to_owned())
            }
            AuthError::WeakPassword(message) => Self::invalid_field("password", message),
            AuthError::InvalidToken(reason) => Self::InvalidToken(reason),
            AuthError::Repository(repo) => repo.into(),
            AuthError::PasswordHash | AuthError::TokenEncoding(_) => Self::Internal(err.to_string()),
        }
    }
}

/// One field-level problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ErrorDetail>>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let details = match &self {
            Self::Validation(errors) => Some(validation_details(errors)),
            _ => None,
        };

        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.code(),
                message: self.message(),
                details,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Flatten nested validation errors into `{field, message}` pairs.
///
/// Field paths use camelCase wire names joined with `.`, and list indices in
/// brackets, e.g. `items[0].price`. Output is sorted by field.
#[must_use]
pub fn validation_details(errors: &ValidationErrors) -> Vec<ErrorDetail> {
    let mut details = Vec::new();
    collect_details(errors, "", &mut details);
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

fn collect_details(errors: &ValidationErrors, prefix: &str, out: &mut Vec<ErrorDetail>) {
    for (field, kind) in errors.errors() {
        let name = camel_case(field);
        let path = if prefix.is_empty() {
            name
        } else if name == "__all__" {
            prefix.to_owned()
        } else {
            format!("{prefix}.{name}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| ErrorDetail {
                    field: path.clone(),
                    message: describe(e),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_details(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_details(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "length" => "has an invalid length".to_owned(),
        "range" => "is out of range".to_owned(),
        "email" => "must be a valid email address".to_owned(),
        "required" => "is required".to_owned(),
        code => format!("is invalid ({code})"),
    }
}

fn camel_case(field: &str) -> String {
    if field == "__all__" {
        return field.to_owned();
    }
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Line {
        #[validate(range(min = 1))]
        quantity: u32,
    }

    #[derive(Debug, Validate)]
    struct Body {
        #[validate(length(min = 3))]
        store_name: String,
        #[validate(nested)]
        items: Vec<Line>,
    }

    async fn body_json(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("compare_at_price"), "compareAtPrice");
        assert_eq!(camel_case("price"), "price");
        assert_eq!(camel_case("parentId"), "parentId");
    }

    #[test]
    fn test_validation_details_are_flattened() {
        let body = Body {
            store_name: "ab".to_owned(),
            items: vec![Line { quantity: 1 }, Line { quantity: 0 }],
        };
        let errors = body.validate().unwrap_err();
        let details = validation_details(&errors);
        let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["items[1].quantity", "storeName"]);
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, json) = body_json(ApiError::NotFound(Entity::Product)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "PRODUCT_NOT_FOUND");
        assert!(json["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_invalid_field_envelope() {
        let (status, json) =
            body_json(ApiError::invalid_field("parentId", "would create a cycle")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"][0]["field"], "parentId");
        assert_eq!(json["error"]["details"][0]["message"], "would create a cycle");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let err = ApiError::Database(RepositoryError::DataCorruption("bad row".to_owned()));
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(json["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_repository_errors_map() {
        let conflict: ApiError = RepositoryError::Conflict("slug taken".to_owned()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let invalid: ApiError = RepositoryError::Invalid {
            field: "parentId",
            message: "cycle".to_owned(),
        }
        .into();
        assert_eq!(invalid.code(), "VALIDATION_ERROR");

        let unmapped: ApiError = RepositoryError::NotFound.into();
        assert_eq!(unmapped.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let mapped = missing(Entity::Order)(RepositoryError::NotFound);
        assert_eq!(mapped.code(), "ORDER_NOT_FOUND");
    }
}
