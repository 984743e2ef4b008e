//! Rounding rules for money values.
//!
//! Every amount in the system is a `rust_decimal::Decimal`; floats are
//! forbidden by workspace lint. Rounding uses Banker's Rounding
//! (`MidpointNearestEven`) so repeated aggregation does not drift.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Decimal places carried by foreign-currency amounts.
pub const FOREIGN_SCALE: u32 = 2;

/// Decimal places carried by base-currency (local) amounts.
pub const LOCAL_SCALE: u32 = 2;

/// Rounds a foreign-currency amount to its storage scale.
#[must_use]
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(FOREIGN_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a base-currency amount to its storage scale.
#[must_use]
pub fn round_local(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(LOCAL_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Multiplies a foreign amount by a rate and rounds to the local scale.
///
/// This is the single place `foreign * rate` happens; callers must not
/// re-derive local amounts elsewhere.
#[must_use]
pub fn cross(foreign_amount: Decimal, rate: Decimal) -> Decimal {
    round_local(foreign_amount * rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cross_basic() {
        assert_eq!(cross(dec!(100), dec!(35)), dec!(3500.00));
    }

    #[test]
    fn test_bankers_rounding_midpoint_to_even() {
        // 2.125 → 2.12 (nearest even at 2 decimals)
        assert_eq!(round_local(dec!(2.125)), dec!(2.12));
        // 2.135 → 2.14
        assert_eq!(round_local(dec!(2.135)), dec!(2.14));
    }

    #[test]
    fn test_cross_rounds_once() {
        // 33.335 * 3 = 100.005 → 100.00 (even)
        assert_eq!(cross(dec!(33.335), dec!(3)), dec!(100.00));
    }
}
