//! The base/foreign movement split.
//!
//! Initial-balance and adjustment entries store their value in different
//! columns depending on whether the affected currency is the branch's base
//! currency: base-currency rows carry the value in `local_amount` with
//! `amount = 0`, foreign-currency rows carry it in `amount` with
//! `local_amount = 0`. Every downstream aggregation preserves this
//! asymmetry, so it is encoded as a sum type and only flattened to the
//! column pair at the persistence boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A signed movement of money in one currency of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Movement {
    /// Movement of a foreign currency; value lives in the `amount` column.
    Foreign {
        /// Signed foreign-currency amount.
        amount: Decimal,
    },
    /// Movement of the branch's base currency; value lives in the
    /// `local_amount` column.
    Base {
        /// Signed base-currency amount.
        local_amount: Decimal,
    },
}

impl Movement {
    /// Builds the movement for a currency, choosing the column by whether it
    /// is the branch's base currency.
    #[must_use]
    pub const fn for_currency(is_base: bool, value: Decimal) -> Self {
        if is_base {
            Self::Base {
                local_amount: value,
            }
        } else {
            Self::Foreign { amount: value }
        }
    }

    /// Returns the signed value regardless of which column carries it.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        match self {
            Self::Foreign { amount } => *amount,
            Self::Base { local_amount } => *local_amount,
        }
    }

    /// Flattens to the denormalised `(amount, local_amount)` column pair.
    ///
    /// The unused column is numeric zero.
    #[must_use]
    pub const fn columns(&self) -> (Decimal, Decimal) {
        match self {
            Self::Foreign { amount } => (*amount, Decimal::ZERO),
            Self::Base { local_amount } => (Decimal::ZERO, *local_amount),
        }
    }

    /// Reconstructs a movement from the stored column pair.
    ///
    /// Trusts the invariant that exactly one column is non-zero for
    /// initial/adjust entries; for base rows the `amount` column is zero.
    #[must_use]
    pub fn from_columns(is_base: bool, amount: Decimal, local_amount: Decimal) -> Self {
        if is_base {
            Self::Base { local_amount }
        } else {
            Self::Foreign { amount }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_base_movement_columns() {
        let m = Movement::for_currency(true, dec!(50000));
        assert_eq!(m.columns(), (Decimal::ZERO, dec!(50000)));
        assert_eq!(m.value(), dec!(50000));
    }

    #[test]
    fn test_foreign_movement_columns() {
        let m = Movement::for_currency(false, dec!(1000));
        assert_eq!(m.columns(), (dec!(1000), Decimal::ZERO));
        assert_eq!(m.value(), dec!(1000));
    }

    #[test]
    fn test_negative_adjustment_keeps_sign() {
        let m = Movement::for_currency(false, dec!(-25.50));
        assert_eq!(m.columns(), (dec!(-25.50), Decimal::ZERO));
    }

    #[test]
    fn test_round_trip_through_columns() {
        for (is_base, value) in [(true, dec!(123.45)), (false, dec!(-7))] {
            let m = Movement::for_currency(is_base, value);
            let (amount, local) = m.columns();
            assert_eq!(Movement::from_columns(is_base, amount, local), m);
        }
    }
}
