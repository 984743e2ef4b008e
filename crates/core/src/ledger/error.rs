//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

use satang_shared::AppError;

/// Errors that can occur while planning ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount must be positive.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Rate must be positive.
    #[error("Rate must be positive, got {0}")]
    NonPositiveRate(Decimal),

    /// No rate published for the currency today.
    #[error("No rate published for {currency} today")]
    NoRateForToday {
        /// Currency code.
        currency: String,
    },

    /// The branch's base-currency till cannot cover the payout.
    #[error(
        "Base currency insufficient: balance {balance}, required {required}, short {shortfall}"
    )]
    BaseCurrencyInsufficient {
        /// Current base balance.
        balance: Decimal,
        /// Amount the operation needs.
        required: Decimal,
        /// How much is missing.
        shortfall: Decimal,
    },

    /// The branch's foreign stock cannot cover the payout.
    #[error(
        "{currency} stock insufficient: balance {balance}, required {required}, short {shortfall}"
    )]
    ForeignStockInsufficient {
        /// Currency code.
        currency: String,
        /// Current foreign balance.
        balance: Decimal,
        /// Amount the operation needs.
        required: Decimal,
        /// How much is missing.
        shortfall: Decimal,
    },

    /// Only buy/sell entries may be reversed.
    #[error("Entry {transaction_no} of type {entry_type} cannot be reversed")]
    NotReversible {
        /// Target transaction number.
        transaction_no: String,
        /// Target entry type, for the message.
        entry_type: String,
    },

    /// The target already carries an active reversal.
    #[error("Transaction {0} is already reversed")]
    AlreadyReversed(String),

    /// The target lies inside a completed EOD window.
    #[error("Transaction {0} belongs to a settled business period")]
    CrossPeriodReversal(String),

    /// Initial balance already set for this (branch, currency).
    #[error("Initial balance already set for {0}")]
    AlreadyInitialized(String),

    /// Branch is locked for EOD and the caller has no override.
    #[error("Branch is locked for end-of-day processing")]
    BusinessLocked,

    /// Dual-direction plan is empty.
    #[error("Denomination plan has no lines")]
    EmptyPlan,

    /// Set-to-zero refused because an initial balance exists.
    #[error("Cannot zero {0}: an initial balance entry exists")]
    ZeroRefused(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NonPositiveAmount(_)
            | LedgerError::NonPositiveRate(_)
            | LedgerError::EmptyPlan
            | LedgerError::NotReversible { .. } => Self::ValidationFailed(err.to_string()),
            LedgerError::NoRateForToday { .. } => Self::RateMissing(err.to_string()),
            LedgerError::BaseCurrencyInsufficient { .. }
            | LedgerError::ForeignStockInsufficient { .. } => {
                Self::BalanceInsufficient(err.to_string())
            }
            LedgerError::AlreadyReversed(_) => Self::AlreadyReversed(err.to_string()),
            LedgerError::CrossPeriodReversal(_) => Self::CrossPeriodReversal(err.to_string()),
            LedgerError::AlreadyInitialized(_) | LedgerError::ZeroRefused(_) => {
                Self::AlreadyInitialized(err.to_string())
            }
            LedgerError::BusinessLocked => Self::BusinessLocked(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_shortfall_message_quotes_all_three_numbers() {
        let err = LedgerError::ForeignStockInsufficient {
            currency: "USD".to_string(),
            balance: dec!(50),
            required: dec!(100),
            shortfall: dec!(50),
        };
        let msg = err.to_string();
        assert!(msg.contains("balance 50"));
        assert!(msg.contains("required 100"));
        assert!(msg.contains("short 50"));
    }

    #[test]
    fn test_app_error_mapping() {
        assert!(matches!(
            AppError::from(LedgerError::AlreadyReversed("T1".into())),
            AppError::AlreadyReversed(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::CrossPeriodReversal("T1".into())),
            AppError::CrossPeriodReversal(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::NoRateForToday {
                currency: "USD".into()
            }),
            AppError::RateMissing(_)
        ));
        assert!(matches!(
            AppError::from(LedgerError::BusinessLocked),
            AppError::BusinessLocked(_)
        ));
    }
}
