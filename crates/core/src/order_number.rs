//! Human-readable order numbers.
//!
//! Each store keeps its own counter. The database increments it inside the
//! order insert transaction; this module only formats the result.

/// Prefix shared by every order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Format a per-store sequence value as an order number.
///
/// Numbers are zero-padded to six digits and simply grow wider past that.
///
/// ```
/// use etic_core::order_number::format_order_number;
///
/// assert_eq!(format_order_number(42), "ORD-000042");
/// ```
#[must_use]
pub fn format_order_number(sequence: i64) -> String {
    format!("{ORDER_NUMBER_PREFIX}{sequence:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(format_order_number(1), "ORD-000001");
        assert_eq!(format_order_number(999_999), "ORD-999999");
    }

    #[test]
    fn test_grows_past_six_digits() {
        assert_eq!(format_order_number(1_234_567), "ORD-1234567");
    }

    #[test]
    fn test_distinct_sequences_give_distinct_numbers() {
        let numbers: std::collections::HashSet<_> = (1..=100).map(format_order_number).collect();
        assert_eq!(numbers.len(), 100);
    }
}
