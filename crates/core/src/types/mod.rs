//! Core types for ETIC.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod localized;
pub mod money;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use localized::LocalizedText;
pub use money::{
    Adjustments, CurrencyCode, CurrencyError, LineAmount, OrderTotals, TotalsError, round_money,
};
pub use role::StoreRole;
pub use status::*;
