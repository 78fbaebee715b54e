//! ETIC Core - Domain types and rules.
//!
//! This crate provides the types shared by every ETIC component:
//! - `api` - Multi-tenant REST API server
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Everything here can be unit tested without a running system.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, statuses, roles and localized text
//! - [`slug`] - URL slug derivation with Turkish transliteration
//! - [`pagination`] - Page requests and response metadata
//! - [`hierarchy`] - Category parent-chain checks
//! - [`order_number`] - Human-readable order numbers
//! - [`stats`] - Ranking helpers for store reports

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod hierarchy;
pub mod order_number;
pub mod pagination;
pub mod slug;
pub mod stats;
pub mod types;

pub use pagination::{PageMeta, PageRequest};
pub use slug::slugify;
pub use types::*;
