//! Text encodings for domain enums.
//!
//! Status and type columns are stored as constrained TEXT; these helpers are
//! the single place the wire spellings live.

use satang_core::amlo::{ReportType, ReservationStatus};
use satang_core::eod::EodRunStatus;
use satang_core::ledger::{EntryStatus, EntryType, TradeDirection};

/// Encodes an entry type for storage.
#[must_use]
pub const fn entry_type_str(value: EntryType) -> &'static str {
    match value {
        EntryType::Buy => "buy",
        EntryType::Sell => "sell",
        EntryType::Reversal => "reversal",
        EntryType::AdjustBalance => "adjust_balance",
        EntryType::InitialBalance => "initial_balance",
        EntryType::CashOut => "cash_out",
        EntryType::EodDiff => "eod_diff",
    }
}

/// Decodes a stored entry type.
#[must_use]
pub fn parse_entry_type(value: &str) -> Option<EntryType> {
    match value {
        "buy" => Some(EntryType::Buy),
        "sell" => Some(EntryType::Sell),
        "reversal" => Some(EntryType::Reversal),
        "adjust_balance" => Some(EntryType::AdjustBalance),
        "initial_balance" => Some(EntryType::InitialBalance),
        "cash_out" => Some(EntryType::CashOut),
        "eod_diff" => Some(EntryType::EodDiff),
        _ => None,
    }
}

/// Encodes an entry status for storage.
#[must_use]
pub const fn entry_status_str(value: EntryStatus) -> &'static str {
    match value {
        EntryStatus::Active => "active",
        EntryStatus::Reversed => "reversed",
    }
}

/// Decodes a stored entry status.
#[must_use]
pub fn parse_entry_status(value: &str) -> Option<EntryStatus> {
    match value {
        "active" => Some(EntryStatus::Active),
        "reversed" => Some(EntryStatus::Reversed),
        _ => None,
    }
}

/// Encodes a trade direction for storage.
#[must_use]
pub const fn direction_str(value: TradeDirection) -> &'static str {
    match value {
        TradeDirection::BranchBuys => "branch_buys",
        TradeDirection::BranchSells => "branch_sells",
    }
}

/// Decodes a stored trade direction.
#[must_use]
pub fn parse_direction(value: &str) -> Option<TradeDirection> {
    match value {
        "branch_buys" => Some(TradeDirection::BranchBuys),
        "branch_sells" => Some(TradeDirection::BranchSells),
        _ => None,
    }
}

/// Encodes an EOD run status for storage.
#[must_use]
pub const fn eod_status_str(value: EodRunStatus) -> &'static str {
    match value {
        EodRunStatus::Processing => "processing",
        EodRunStatus::Completed => "completed",
        EodRunStatus::Cancelled => "cancelled",
    }
}

/// Decodes a stored EOD run status.
#[must_use]
pub fn parse_eod_status(value: &str) -> Option<EodRunStatus> {
    match value {
        "processing" => Some(EodRunStatus::Processing),
        "completed" => Some(EodRunStatus::Completed),
        "cancelled" => Some(EodRunStatus::Cancelled),
        _ => None,
    }
}

/// Encodes a reservation status for storage.
#[must_use]
pub const fn reservation_status_str(value: ReservationStatus) -> &'static str {
    match value {
        ReservationStatus::Pending => "pending",
        ReservationStatus::Approved => "approved",
        ReservationStatus::Rejected => "rejected",
        ReservationStatus::Completed => "completed",
    }
}

/// Decodes a stored reservation status.
#[must_use]
pub fn parse_reservation_status(value: &str) -> Option<ReservationStatus> {
    match value {
        "pending" => Some(ReservationStatus::Pending),
        "approved" => Some(ReservationStatus::Approved),
        "rejected" => Some(ReservationStatus::Rejected),
        "completed" => Some(ReservationStatus::Completed),
        _ => None,
    }
}

/// Encodes a report type for storage (the regulator's form code).
#[must_use]
pub const fn report_type_str(value: ReportType) -> &'static str {
    value.code()
}

/// Decodes a stored report type.
#[must_use]
pub fn parse_report_type(value: &str) -> Option<ReportType> {
    ReportType::parse(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_round_trip() {
        for value in [
            EntryType::Buy,
            EntryType::Sell,
            EntryType::Reversal,
            EntryType::AdjustBalance,
            EntryType::InitialBalance,
            EntryType::CashOut,
            EntryType::EodDiff,
        ] {
            assert_eq!(parse_entry_type(entry_type_str(value)), Some(value));
        }
        assert_eq!(parse_entry_type("unknown"), None);
    }

    #[test]
    fn test_status_round_trips() {
        assert_eq!(
            parse_entry_status(entry_status_str(EntryStatus::Reversed)),
            Some(EntryStatus::Reversed)
        );
        assert_eq!(
            parse_eod_status(eod_status_str(EodRunStatus::Cancelled)),
            Some(EodRunStatus::Cancelled)
        );
        assert_eq!(
            parse_reservation_status(reservation_status_str(ReservationStatus::Approved)),
            Some(ReservationStatus::Approved)
        );
        assert_eq!(parse_report_type("AMLO-1-02"), Some(ReportType::Property));
    }
}
