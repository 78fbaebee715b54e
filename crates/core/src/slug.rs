//! URL slug derivation.
//!
//! Slugs identify categories, products, collections and stores in URLs. They
//! are lowercase ASCII letters, digits and single hyphens.

/// Map one character to its slug form, or `None` if it acts as a separator.
///
/// Turkish letters are transliterated in both cases. Dotted capital `İ`
/// becomes a plain `i` rather than `i` plus a combining dot.
const fn slug_char(c: char) -> Option<char> {
    match c {
        'a'..='z' | '0'..='9' => Some(c),
        'A'..='Z' => Some(c.to_ascii_lowercase()),
        'ğ' | 'Ğ' => Some('g'),
        'ü' | 'Ü' => Some('u'),
        'ş' | 'Ş' => Some('s'),
        'ı' | 'İ' => Some('i'),
        'ö' | 'Ö' => Some('o'),
        'ç' | 'Ç' => Some('c'),
        _ => None,
    }
}

/// Derive a URL slug from free text.
///
/// Letters are lowercased and Turkish characters transliterated
/// (`ğ→g ü→u ş→s ı→i ö→o ç→c`). Every run of anything else collapses to a
/// single `-`, and leading or trailing hyphens are dropped. The result may be
/// empty when the input has no usable characters.
///
/// ```
/// use etic_core::slugify;
///
/// assert_eq!(slugify("Çocuk Giyim & Ayakkabı"), "cocuk-giyim-ayakkabi");
/// assert_eq!(slugify("  --Hello, World!-- "), "hello-world");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.chars() {
        match slug_char(c) {
            Some(mapped) => {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.push(mapped);
            }
            None => pending_separator = true,
        }
    }

    slug
}

/// Whether `s` is already a well-formed slug (`^[a-z0-9-]+$`).
#[must_use]
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
