//! Success envelope: `{ "success": true, "data": ..., "meta"?: {...} }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use etic_core::PageMeta;

use crate::models::Message;

/// A successful response body with its status code.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data,
            meta: None,
        }
    }

    /// 201 with the created resource.
    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            data,
            meta: None,
        }
    }

    /// 200 with one page of results and its pagination meta.
    pub const fn paginated(data: T, meta: PageMeta) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

impl ApiResponse<Message> {
    /// 200 with `{ "message": ... }`, used by deletes.
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(Message::new(message))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    async fn render<T: Serialize>(response: ApiResponse<T>) -> (StatusCode, Value) {
        let response = response.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ok_envelope() {
        let (status, json) = render(ApiResponse::ok(json!({"id": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"success": true, "data": {"id": 1}}));
    }

    #[tokio::test]
    async fn test_created_status() {
        let (status, _) = render(ApiResponse::created(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_paginated_meta() {
        let meta = etic_core::PageRequest::new(Some(2), Some(20)).meta(45);
        let (_, json) = render(ApiResponse::paginated(json!([]), meta)).await;
        assert_eq!(
            json["meta"],
            json!({"page": 2, "limit": 20, "total": 45, "totalPages": 3})
        );
    }

    #[tokio::test]
    async fn test_delete_message() {
        let (_, json) = render(ApiResponse::message("Product deleted successfully")).await;
        assert_eq!(json["data"]["message"], "Product deleted successfully");
    }
}
