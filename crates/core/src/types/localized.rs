//! Multi-language text fields.
//!
//! Category names, product titles and their descriptions are stored either as
//! a plain string or as a map from language code to string. Display code calls
//! [`LocalizedText::resolve`] with the viewer's language.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Primary fallback language.
pub const PRIMARY_LANGUAGE: &str = "tr";

/// Secondary fallback language.
pub const SECONDARY_LANGUAGE: &str = "en";

/// A text value that is either language-neutral or translated.
///
/// On the wire this is a bare JSON string or an object such as
/// `{"tr": "Elektronik", "en": "Electronics"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    /// The same text in every language.
    Plain(String),
    /// Translations keyed by language code.
    Localized(BTreeMap<String, String>),
}

impl LocalizedText {
    /// Build a single-language value.
    #[must_use]
    pub fn single(lang: &str, text: impl Into<String>) -> Self {
        Self::Localized(BTreeMap::from([(lang.to_owned(), text.into())]))
    }

    /// Resolve to display text.
    ///
    /// Lookup order is `lang`, then `tr`, then `en`, then the empty string.
    /// Empty translations are skipped. A plain value resolves to itself.
    #[must_use]
    pub fn resolve(&self, lang: &str) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Localized(map) => [lang, PRIMARY_LANGUAGE, SECONDARY_LANGUAGE]
                .into_iter()
                .filter_map(|key| map.get(key))
                .find(|text| !text.is_empty())
                .map_or("", String::as_str),
        }
    }

    /// True when no language carries any non-whitespace text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Plain(text) => text.trim().is_empty(),
            Self::Localized(map) => map.values().all(|text| text.trim().is_empty()),
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        Self::Plain(text.to_owned())
    }
}

impl From<String> for LocalizedText {
    fn from(text: String) -> Self {
        Self::Plain(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn localized(pairs: &[(&str, &str)]) -> LocalizedText {
        LocalizedText::Localized(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    #[test]
    fn test_requested_language_wins() {
        let text = localized(&[("tr", "A"), ("en", "B"), ("de", "D")]);
        assert_eq!(text.resolve("de"), "D");
    }

    #[test]
    fn test_falls_back_to_turkish() {
        let text = localized(&[("tr", "A"), ("en", "B")]);
        assert_eq!(text.resolve("fr"), "A");
    }

    #[test]
    fn test_falls_back_to_english() {
        let text = localized(&[("en", "B")]);
        assert_eq!(text.resolve("fr"), "B");
    }

    #[test]
    fn test_plain_resolves_to_itself() {
        assert_eq!(LocalizedText::from("C").resolve("fr"), "C");
    }

    #[test]
    fn test_empty_translation_is_skipped() {
        let text = localized(&[("fr", ""), ("tr", "A")]);
        assert_eq!(text.resolve("fr"), "A");
    }

    #[test]
    fn test_nothing_resolves_to_empty() {
        assert_eq!(localized(&[("de", "D")]).resolve("fr"), "");
    }

    #[test]
    fn test_untagged_serde() {
        let plain: LocalizedText = serde_json::from_str("\"Kitap\"").unwrap();
        assert_eq!(plain, LocalizedText::from("Kitap"));

        let map: LocalizedText = serde_json::from_str(r#"{"tr":"Kitap","en":"Book"}"#).unwrap();
        assert_eq!(map.resolve("en"), "Book");
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"en":"Book","tr":"Kitap"}"#
        );
    }

    #[test]
    fn test_is_blank() {
        assert!(LocalizedText::from("  ").is_blank());
        assert!(localized(&[("tr", "")]).is_blank());
        assert!(!localized(&[("tr", ""), ("en", "x")]).is_blank());
    }
}
