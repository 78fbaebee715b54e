//! HTTP middleware and extractors.

pub mod auth;
pub mod request_id;

pub use auth::AuthUser;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
