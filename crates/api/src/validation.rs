//! Shared request validation helpers.
//!
//! Custom `validator` rules for money, slugs and tags, the tri-state
//! deserializer used by PATCH bodies, and slug resolution for create
//! requests.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

use etic_core::slug::is_valid_slug;
use etic_core::{Email, LocalizedText, slugify};

use crate::error::ApiError;

/// Largest amount a `NUMERIC(12, 2)` column holds.
pub(crate) const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Allowed store slug lengths.
const STORE_SLUG_LENGTH: std::ops::RangeInclusive<usize> = 3..=63;

/// Longest accepted tag.
const MAX_TAG_LENGTH: usize = 50;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Amount must be greater than zero and fit the money column.
///
/// # Errors
///
/// Returns a `positive` validation error otherwise.
pub fn positive_money(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(error("positive", "must be greater than zero"));
    }
    if *value > MAX_MONEY {
        return Err(error("range", "is too large"));
    }
    Ok(())
}

/// Amount must be zero or more and fit the money column.
///
/// # Errors
///
/// Returns a `non_negative` validation error otherwise.
pub fn non_negative_money(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(error("non_negative", "cannot be negative"));
    }
    if *value > MAX_MONEY {
        return Err(error("range", "is too large"));
    }
    Ok(())
}

/// Value must parse as an [`Email`].
///
/// # Errors
///
/// Returns an `email` validation error describing the problem.
pub fn email(value: &str) -> Result<(), ValidationError> {
    Email::parse(value).map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("email");
        err.message = Some(Cow::Owned(e.to_string()));
        err
    })
}

/// Parse an email that has already passed [`email`].
///
/// # Errors
///
/// Returns a validation error on `field` if parsing fails.
pub fn parse_email(value: &str, field: &'static str) -> Result<Email, ApiError> {
    Email::parse(value).map_err(|e| ApiError::invalid_field(field, e.to_string()))
}

/// Store slug: 3 to 63 lowercase letters, digits and hyphens, starting and
/// ending with a letter or digit.
///
/// # Errors
///
/// Returns a `slug` validation error otherwise.
pub fn store_slug(value: &str) -> Result<(), ValidationError> {
    let valid = STORE_SLUG_LENGTH.contains(&value.len())
        && is_valid_slug(value)
        && !value.starts_with('-')
        && !value.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(error(
            "slug",
            "must be 3 to 63 characters of a-z, 0-9 and inner hyphens",
        ))
    }
}

/// Localized text must carry some non-whitespace text.
///
/// # Errors
///
/// Returns a `required` validation error otherwise.
pub fn not_blank(value: &LocalizedText) -> Result<(), ValidationError> {
    if value.is_blank() {
        Err(error("required", "cannot be empty"))
    } else {
        Ok(())
    }
}

/// Every tag must be non-empty and at most 50 characters.
///
/// # Errors
///
/// Returns a `tags` validation error otherwise.
pub fn tags(value: &[String]) -> Result<(), ValidationError> {
    let ok = value.iter().all(|tag| {
        let tag = tag.trim();
        !tag.is_empty() && tag.chars().count() <= MAX_TAG_LENGTH
    });
    if ok {
        Ok(())
    } else {
        Err(error(
            "tags",
            "tags must be non-empty and at most 50 characters",
        ))
    }
}

/// Trim tags and drop repeats, keeping first-seen order.
#[must_use]
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_owned();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Drop repeated IDs, keeping first-seen order.
#[must_use]
pub fn dedup_ids<T: PartialEq + Copy>(ids: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// Pick the slug for a new catalog entry.
///
/// A provided slug is normalized with [`slugify`]; otherwise the slug comes
/// from `source` resolved in `language`. Either way the result must be
/// non-empty.
///
/// # Errors
///
/// Returns a validation error on `slug` if nothing usable remains.
pub fn resolve_slug(
    provided: Option<&str>,
    source: &LocalizedText,
    language: &str,
) -> Result<String, ApiError> {
    let slug = match provided {
        Some(slug) => slugify(slug),
        None => slugify(source.resolve(language)),
    };
    if slug.is_empty() {
        return Err(ApiError::invalid_field(
            "slug",
            "slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// Normalize a slug given in an update request.
///
/// # Errors
///
/// Returns a validation error on `slug` if it normalizes to nothing.
pub fn normalize_slug(slug: &str) -> Result<String, ApiError> {
    let slug = slugify(slug);
    if slug.is_empty() {
        return Err(ApiError::invalid_field(
            "slug",
            "slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// Deserialize a PATCH field that distinguishes "absent" from `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: absent gives `None`, `null` gives `Some(None)`.
///
/// # Errors
///
/// Propagates the inner deserializer's error.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.note, None);
        let null: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(null.note, Some(None));
        let set: Patch = serde_json::from_str(r#"{"note": "hi"}"#).unwrap();
        assert_eq!(set.note, Some(Some("hi".to_owned())));
    }

    #[test]
    fn test_money_rules() {
        assert!(positive_money(&Decimal::new(4_500_000, 2)).is_ok());
        assert!(positive_money(&Decimal::ZERO).is_err());
        assert!(positive_money(&Decimal::new(-1, 0)).is_err());
        assert!(positive_money(&MAX_MONEY).is_ok());
        assert!(positive_money(&Decimal::new(10_000_000_000, 0)).is_err());
        assert!(non_negative_money(&Decimal::ZERO).is_ok());
        assert!(non_negative_money(&Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn test_max_money_value() {
        assert_eq!(MAX_MONEY.to_string(), "9999999999.99");
    }

    #[test]
    fn test_email_rule() {
        assert!(email("Demo@Etic.com").is_ok());
        assert!(email("not-an-email").is_err());
        assert_eq!(
            parse_email(" Demo@Etic.com ", "email").unwrap().as_str(),
            "demo@etic.com"
        );
    }

    #[test]
    fn test_store_slug() {
        assert!(store_slug("demo-store").is_ok());
        assert!(store_slug("ab").is_err());
        assert!(store_slug("Demo").is_err());
        assert!(store_slug("demo store").is_err());
        assert!(store_slug("-ab-").is_err());
        assert!(store_slug("-abc").is_err());
        assert!(store_slug("abc-").is_err());
        assert!(store_slug(&"a".repeat(63)).is_ok());
        assert!(store_slug(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_tags() {
        assert!(tags(&["vip".to_owned()]).is_ok());
        assert!(tags(&[" ".to_owned()]).is_err());
        assert!(tags(&["x".repeat(51)]).is_err());
        assert_eq!(
            dedup_tags(vec!["vip".into(), " new ".into(), "vip".into()]),
            vec!["vip".to_owned(), "new".to_owned()]
        );
    }

    #[test]
    fn test_dedup_ids() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn test_resolve_slug() {
        let title = LocalizedText::single("tr", "Akıllı Telefon");
        assert_eq!(resolve_slug(None, &title, "tr").unwrap(), "akilli-telefon");
        assert_eq!(
            resolve_slug(Some("  Özel Ürün "), &title, "tr").unwrap(),
            "ozel-urun"
        );
        assert!(resolve_slug(Some("!!!"), &title, "tr").is_err());
        assert!(resolve_slug(None, &LocalizedText::from(""), "tr").is_err());
    }
}
