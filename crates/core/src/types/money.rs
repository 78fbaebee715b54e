//! Monetary amounts, currency codes and order totals.
//!
//! All money is [`Decimal`] with two fractional digits. Order totals are
//! never accepted from clients; they are derived from line items and
//! adjustments by [`OrderTotals::compute`].

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits stored for every amount (`NUMERIC(12,2)`).
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to the stored money scale, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

// =============================================================================
// Currency
// =============================================================================

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("currency must be a three-letter ISO 4217 code")]
pub struct CurrencyError;

/// An ISO 4217 currency code such as `TRY` or `EUR`.
///
/// Input is accepted in any case and stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Default store and order currency.
    pub const DEFAULT: &'static str = "TRY";

    /// Parse a currency code.
    ///
    /// # Errors
    ///
    /// Returns [`CurrencyError`] unless the input is exactly three ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CurrencyError> {
        let s = s.trim();
        if s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Err(CurrencyError)
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

// =============================================================================
// Order totals
// =============================================================================

/// Why a set of order amounts was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TotalsError {
    /// The order has no line items.
    #[error("order must contain at least one item")]
    NoItems,
    /// A line item has a zero or negative unit price.
    #[error("item {index} price must be greater than zero")]
    NonPositivePrice {
        /// Zero-based position of the offending line.
        index: usize,
    },
    /// A line item has zero quantity.
    #[error("item {index} quantity must be greater than zero")]
    ZeroQuantity {
        /// Zero-based position of the offending line.
        index: usize,
    },
    /// Discount, tax or shipping is negative.
    #[error("{field} cannot be negative")]
    NegativeAdjustment {
        /// Wire name of the adjustment.
        field: &'static str,
    },
    /// The discount would push the total below zero.
    #[error("discount cannot exceed subtotal plus tax and shipping")]
    DiscountTooLarge,
    /// An intermediate amount does not fit in a decimal.
    #[error("order amounts are too large")]
    Overflow,
}

impl TotalsError {
    /// Request field the error should be reported against.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::NoItems | Self::NonPositivePrice { .. } | Self::ZeroQuantity { .. } => "items",
            Self::NegativeAdjustment { field } => *field,
            Self::DiscountTooLarge => "discount",
            Self::Overflow => "total",
        }
    }
}

/// A single priced line: unit price and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    /// Unit price.
    pub price: Decimal,
    /// Units ordered.
    pub quantity: u32,
}

impl LineAmount {
    /// `price × quantity`, rounded to the money scale.
    ///
    /// # Errors
    ///
    /// Returns [`TotalsError::Overflow`] if the product does not fit.
    pub fn total(&self) -> Result<Decimal, TotalsError> {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .map(round_money)
            .ok_or(TotalsError::Overflow)
    }
}

/// Order-level adjustments applied on top of the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Adjustments {
    /// Amount subtracted from the order.
    pub discount: Decimal,
    /// Tax added to the order.
    pub tax: Decimal,
    /// Shipping cost added to the order.
    pub shipping: Decimal,
}

/// The derived monetary fields persisted on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Derive totals from line items and adjustments.
    ///
    /// `subtotal = Σ price × quantity` and
    /// `total = subtotal − discount + tax + shipping`.
    ///
    /// # Errors
    ///
    /// Rejects empty orders, non-positive prices, zero quantities, negative
    /// adjustments, discounts larger than the rest of the order, and overflow.
    pub fn compute<I>(lines: I, adjustments: Adjustments) -> Result<Self, TotalsError>
    where
        I: IntoIterator<Item = LineAmount>,
    {
        let mut subtotal = Decimal::ZERO;
        let mut count = 0usize;

        for (index, line) in lines.into_iter().enumerate() {
            if line.price <= Decimal::ZERO {
                return Err(TotalsError::NonPositivePrice { index });
            }
            if line.quantity == 0 {
                return Err(TotalsError::ZeroQuantity { index });
            }
            subtotal = subtotal
                .checked_add(line.total()?)
                .ok_or(TotalsError::Overflow)?;
            count += 1;
        }

        if count == 0 {
            return Err(TotalsError::NoItems);
        }

        let Adjustments {
            discount,
            tax,
            shipping,
        } = adjustments;

        for (field, value) in [("discount", discount), ("tax", tax), ("shipping", shipping)] {
            if value < Decimal::ZERO {
                return Err(TotalsError::NegativeAdjustment { field });
            }
        }

        let discount = round_money(discount);
        let tax = round_money(tax);
        let shipping = round_money(shipping);

        let gross = subtotal
            .checked_add(tax)
            .and_then(|v| v.checked_add(shipping))
            .ok_or(TotalsError::Overflow)?;

        if discount > gross {
            return Err(TotalsError::DiscountTooLarge);
        }

        Ok(Self {
            subtotal: round_money(subtotal),
            discount,
            tax,
            shipping,
            total: round_money(gross - discount),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(price: &str, quantity: u32) -> LineAmount {
        LineAmount {
            price: dec(price),
            quantity,
        }
    }

    #[test]
    fn test_single_line_without_adjustments() {
        let totals = OrderTotals::compute([line("45000.00", 2)], Adjustments::default()).unwrap();
        assert_eq!(totals.subtotal, dec("90000.00"));
        assert_eq!(totals.total, dec("90000.00"));
        assert_eq!(totals.subtotal.to_string(), "90000.00");
    }

    #[test]
    fn test_total_formula_holds() {
        let adjustments = Adjustments {
            discount: dec("10.00"),
            tax: dec("18.00"),
            shipping: dec("50.00"),
        };
        let totals =
            OrderTotals::compute([line("25.50", 2), line("49.00", 1)], adjustments).unwrap();

        assert_eq!(totals.subtotal, dec("100.00"));
        assert_eq!(
            totals.total,
            totals.subtotal - totals.discount + totals.tax + totals.shipping
        );
        assert_eq!(totals.total, dec("158.00"));
    }

    #[test]
    fn test_rejects_empty_order() {
        assert_eq!(
            OrderTotals::compute([], Adjustments::default()),
            Err(TotalsError::NoItems)
        );
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert_eq!(
            OrderTotals::compute([line("1.00", 1), line("0", 1)], Adjustments::default()),
            Err(TotalsError::NonPositivePrice { index: 1 })
        );
        assert_eq!(
            OrderTotals::compute([line("1.00", 0)], Adjustments::default()),
            Err(TotalsError::ZeroQuantity { index: 0 })
        );
    }

    #[test]
    fn test_rejects_negative_adjustment() {
        let adjustments = Adjustments {
            tax: dec("-1"),
            ..Adjustments::default()
        };
        let err = OrderTotals::compute([line("10", 1)], adjustments).unwrap_err();
        assert_eq!(err, TotalsError::NegativeAdjustment { field: "tax" });
        assert_eq!(err.field(), "tax");
    }

    #[test]
    fn test_discount_bounds() {
        let exact = Adjustments {
            discount: dec("60.00"),
            shipping: dec("10.00"),
            ..Adjustments::default()
        };
        let totals = OrderTotals::compute([line("50", 1)], exact).unwrap();
        assert_eq!(totals.total, dec("0.00"));

        let too_much = Adjustments {
            discount: dec("60.01"),
            shipping: dec("10.00"),
            ..Adjustments::default()
        };
        assert_eq!(
            OrderTotals::compute([line("50", 1)], too_much),
            Err(TotalsError::DiscountTooLarge)
        );
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec("1.005")).to_string(), "1.01");
        assert_eq!(round_money(dec("7")).to_string(), "7.00");
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(CurrencyCode::default().as_str(), "TRY");
        assert_eq!(CurrencyCode::parse("eur").unwrap().as_str(), "EUR");
        assert!(CurrencyCode::parse("EURO").is_err());
        assert!(CurrencyCode::parse("E1R").is_err());
    }
}
