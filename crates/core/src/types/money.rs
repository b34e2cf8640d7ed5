//! Decimal prices and their minor-unit form.
//!
//! Catalog and checkout prices are `rust_decimal::Decimal` in major units
//! (dollars). Payment providers want integer minor units (cents).
//!
//! Stored amounts carry at most two decimal places. Unit prices have at most
//! [`PRICE_INTEGER_DIGITS`] integer digits and order totals at most
//! [`TOTAL_INTEGER_DIGITS`], matching the `NUMERIC` columns that hold them.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    #[error("price is too large: {0}")]
    Overflow(Decimal),
    #[error("price has more than two decimal places: {0}")]
    TooPrecise(Decimal),
}

/// Integer digits allowed in a unit price.
pub const PRICE_INTEGER_DIGITS: u32 = 10;

/// Integer digits allowed in an order total.
pub const TOTAL_INTEGER_DIGITS: u32 = 12;

/// Check that `amount` is a storable money value with at most
/// `integer_digits` digits before the decimal point.
///
/// ```
/// use rust_decimal::Decimal;
/// use wardrobe_core::{PRICE_INTEGER_DIGITS, check_amount};
///
/// assert!(check_amount(Decimal::new(1999, 2), PRICE_INTEGER_DIGITS).is_ok());
/// assert!(check_amount(Decimal::new(12_345, 3), PRICE_INTEGER_DIGITS).is_err());
/// ```
///
/// # Errors
///
/// Returns [`MoneyError::Negative`] below zero, [`MoneyError::TooPrecise`] for
/// sub-cent fractions and [`MoneyError::Overflow`] past the digit limit.
pub fn check_amount(amount: Decimal, integer_digits: u32) -> Result<(), MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative(amount));
    }
    if amount.normalize().scale() > 2 {
        return Err(MoneyError::TooPrecise(amount));
    }
    let limit = 10_u64
        .checked_pow(integer_digits)
        .map_or(Decimal::MAX, Decimal::from);
    if amount >= limit {
        return Err(MoneyError::Overflow(amount));
    }
    Ok(())
}

/// Check a catalog unit price.
///
/// # Errors
///
/// See [`check_amount`].
pub fn check_price(price: Decimal) -> Result<(), MoneyError> {
    check_amount(price, PRICE_INTEGER_DIGITS)
}

/// Convert a major-unit price to minor units, rounding half away from zero.
///
/// ```
/// use rust_decimal::Decimal;
/// use wardrobe_core::to_minor_units;
///
/// assert_eq!(to_minor_units(Decimal::new(1999, 2)).unwrap(), 1999);
/// assert_eq!(to_minor_units(Decimal::new(10005, 3)).unwrap(), 1001);
/// ```
///
/// # Errors
///
/// Returns [`MoneyError::Negative`] for prices below zero and
/// [`MoneyError::Overflow`] when the result does not fit in an `i64`.
pub fn to_minor_units(price: Decimal) -> Result<i64, MoneyError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(MoneyError::Negative(price));
    }
    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .ok_or(MoneyError::Overflow(price))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn whole_and_fractional_prices() {
        assert_eq!(to_minor_units(Decimal::new(85, 0)).unwrap(), 8500);
        assert_eq!(to_minor_units(Decimal::new(1250, 2)).unwrap(), 1250);
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
    }

    #[test]
    fn rounds_sub_cent_amounts() {
        assert_eq!(to_minor_units(Decimal::new(12_345, 3)).unwrap(), 1235);
        assert_eq!(to_minor_units(Decimal::new(12_344, 3)).unwrap(), 1234);
    }

    #[test]
    fn rejects_negative_prices() {
        assert!(matches!(
            to_minor_units(Decimal::new(-1, 0)),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn price_bounds_follow_column_precision() {
        assert!(check_price(Decimal::new(999_999_999_999, 2)).is_ok());
        assert!(check_price(Decimal::new(1250, 2)).is_ok());
        assert!(check_price(Decimal::new(12_500, 3)).is_ok());
        assert_eq!(
            check_price(Decimal::new(10_000_000_000, 0)),
            Err(MoneyError::Overflow(Decimal::new(10_000_000_000, 0)))
        );
        assert_eq!(
            check_price(Decimal::new(12_345, 3)),
            Err(MoneyError::TooPrecise(Decimal::new(12_345, 3)))
        );
        assert!(matches!(
            check_price(Decimal::new(-5, 1)),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn totals_allow_two_more_digits() {
        let amount = Decimal::new(10_000_000_000, 0);
        assert!(check_amount(amount, TOTAL_INTEGER_DIGITS).is_ok());
        assert!(check_amount(amount * Decimal::ONE_HUNDRED, TOTAL_INTEGER_DIGITS).is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(matches!(
            to_minor_units(Decimal::MAX),
            Err(MoneyError::Overflow(_))
        ));
    }
}
