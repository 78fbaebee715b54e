//! Domain models returned by the API.
//!
//! These types represent validated domain objects separate from database row
//! types. All of them serialize with camelCase field names.

pub mod catalog;
pub mod customer;
pub mod order;
pub mod stats;
pub mod store;
pub mod user;

use serde::Serialize;

/// Body of a successful delete: `{ "message": "..." }`.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    /// Create a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
