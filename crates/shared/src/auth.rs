//! Authentication types: capabilities, languages, and the current user.
//!
//! Token issuance and role management live in a collaborator service; the
//! core only depends on the branch, the capability strings, and the
//! preferred language carried by the claims.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{BranchId, OperatorId};

/// Capability strings recognised by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Execute buy/sell exchanges.
    TransactionExecute,
    /// Manage balances (initial, adjust, set-to-zero) and override the EOD lock.
    BalanceManage,
    /// Reverse committed transactions.
    ReverseTransaction,
    /// Manage and publish daily rates.
    RateManage,
    /// Audit AMLO reservations.
    AmloReservationAudit,
    /// Submit AMLO reports to the regulator.
    AmloReportSubmit,
    /// View transaction history.
    ViewTransactions,
    /// View balances and stock.
    ViewBalances,
    /// System administration (EOD cleanup, data reset).
    SystemManage,
}

/// Receipt / report language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Thai.
    #[default]
    Th,
    /// English.
    En,
    /// Chinese.
    Zh,
}

impl Language {
    /// Returns the filename suffix for localised receipts, if any.
    ///
    /// Thai is the default rendering and carries no suffix.
    #[must_use]
    pub const fn filename_suffix(self) -> Option<&'static str> {
        match self {
            Self::Th => None,
            Self::En => Some("en"),
            Self::Zh => Some("zh"),
        }
    }
}

/// The authenticated operator as seen by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Operator identity.
    pub id: OperatorId,
    /// The branch this operator works at.
    pub branch_id: BranchId,
    /// Granted capabilities.
    pub capabilities: Vec<Capability>,
    /// Preferred language for receipts and messages.
    pub preferred_language: Language,
}

impl CurrentUser {
    /// Returns true if the operator holds the given capability.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Returns true if the operator may act on the given branch.
    #[must_use]
    pub fn same_branch(&self, branch_id: BranchId) -> bool {
        self.branch_id == branch_id
    }
}

impl Capability {
    /// Parses a capability from its wire string.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "transaction_execute" => Some(Self::TransactionExecute),
            "balance_manage" => Some(Self::BalanceManage),
            "reverse_transaction" => Some(Self::ReverseTransaction),
            "rate_manage" => Some(Self::RateManage),
            "amlo_reservation_audit" => Some(Self::AmloReservationAudit),
            "amlo_report_submit" => Some(Self::AmloReportSubmit),
            "view_transactions" => Some(Self::ViewTransactions),
            "view_balances" => Some(Self::ViewBalances),
            "system_manage" => Some(Self::SystemManage),
            _ => None,
        }
    }

    /// Returns the wire string for this capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransactionExecute => "transaction_execute",
            Self::BalanceManage => "balance_manage",
            Self::ReverseTransaction => "reverse_transaction",
            Self::RateManage => "rate_manage",
            Self::AmloReservationAudit => "amlo_reservation_audit",
            Self::AmloReportSubmit => "amlo_report_submit",
            Self::ViewTransactions => "view_transactions",
            Self::ViewBalances => "view_balances",
            Self::SystemManage => "system_manage",
        }
    }
}

/// Builds a `CurrentUser` from raw claim fields.
#[must_use]
pub fn user_from_claims(
    operator: Uuid,
    branch: Uuid,
    capabilities: &[String],
    language: Language,
) -> CurrentUser {
    CurrentUser {
        id: OperatorId::from_uuid(operator),
        branch_id: BranchId::from_uuid(branch),
        capabilities: capabilities
            .iter()
            .filter_map(|s| Capability::from_str_opt(s))
            .collect(),
        preferred_language: language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_round_trip() {
        for cap in [
            Capability::TransactionExecute,
            Capability::BalanceManage,
            Capability::ReverseTransaction,
            Capability::RateManage,
            Capability::AmloReservationAudit,
            Capability::AmloReportSubmit,
            Capability::ViewTransactions,
            Capability::ViewBalances,
            Capability::SystemManage,
        ] {
            assert_eq!(Capability::from_str_opt(cap.as_str()), Some(cap));
        }
        assert_eq!(Capability::from_str_opt("root"), None);
    }

    #[test]
    fn test_current_user_can() {
        let user = user_from_claims(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &["transaction_execute".to_string(), "bogus".to_string()],
            Language::En,
        );
        assert!(user.can(Capability::TransactionExecute));
        assert!(!user.can(Capability::SystemManage));
        // Unknown capability strings are dropped, not errors.
        assert_eq!(user.capabilities.len(), 1);
    }

    #[test]
    fn test_language_suffix() {
        assert_eq!(Language::Th.filename_suffix(), None);
        assert_eq!(Language::En.filename_suffix(), Some("en"));
        assert_eq!(Language::Zh.filename_suffix(), Some("zh"));
    }
}
