//! AMLO domain records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use satang_shared::types::{AmloReportId, BranchId, LedgerEntryId, OperatorId, ReservationId};

use super::error::AmloError;
use super::state::ReservationStatus;
use crate::ledger::TradeDirection;

/// The three regulator form types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    /// AMLO-1-01: cash transaction report.
    Cash,
    /// AMLO-1-02: property transaction report.
    Property,
    /// AMLO-1-03: suspicious transaction report.
    Suspicious,
}

impl ReportType {
    /// The regulator's form code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Cash => "AMLO-1-01",
            Self::Property => "AMLO-1-02",
            Self::Suspicious => "AMLO-1-03",
        }
    }

    /// Template PDF filename under the templates root.
    #[must_use]
    pub const fn template_filename(self) -> &'static str {
        match self {
            Self::Cash => "amlo-1-01.pdf",
            Self::Property => "amlo-1-02.pdf",
            Self::Suspicious => "amlo-1-03.pdf",
        }
    }

    /// Parses the regulator's form code.
    pub fn parse(code: &str) -> Result<Self, AmloError> {
        match code {
            "AMLO-1-01" => Ok(Self::Cash),
            "AMLO-1-02" => Ok(Self::Property),
            "AMLO-1-03" => Ok(Self::Suspicious),
            other => Err(AmloError::UnknownReportType(other.to_string())),
        }
    }
}

/// An intake reservation awaiting audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Surrogate id.
    pub id: ReservationId,
    /// Number printed on the regulator form.
    pub reservation_no: String,
    /// Owning branch.
    pub branch_id: BranchId,
    /// Customer display name.
    pub customer_name: String,
    /// Customer document id.
    pub customer_id: String,
    /// Amount of the underlying trade, in base currency.
    pub amount: Decimal,
    /// Foreign currency of the underlying trade.
    pub currency: String,
    /// Direction of the underlying trade.
    pub direction: TradeDirection,
    /// Regulator form type.
    pub report_type: ReportType,
    /// Audit lifecycle state.
    pub status: ReservationStatus,
    /// Reason, when rejected.
    pub rejection_reason: Option<String>,
    /// Auditor identity, once audited.
    pub audited_by: Option<OperatorId>,
    /// Operator who took the reservation.
    pub created_by: OperatorId,
    /// Ledger linkage, once the trade is finalised.
    pub linked_transaction_id: Option<LedgerEntryId>,
    /// Opaque PDF field payload keyed by widget name.
    pub form_data: serde_json::Value,
    /// Intake time.
    pub created_at: DateTime<Utc>,
}

/// A report row emitted when a reservation is approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmloReport {
    /// Surrogate id.
    pub id: AmloReportId,
    /// Originating reservation.
    pub reservation_id: ReservationId,
    /// Regulator form type.
    pub report_type: ReportType,
    /// Amount of the underlying trade.
    pub transaction_amount: Decimal,
    /// Business date of the underlying trade.
    pub transaction_date: NaiveDate,
    /// Whether the row was submitted to the regulator.
    pub is_reported: bool,
    /// Submission time, once reported.
    pub report_time: Option<DateTime<Utc>>,
    /// Reporter identity, once reported.
    pub reported_by: Option<OperatorId>,
    /// Generated PDF filename, once rendered.
    pub pdf_filename: Option<String>,
    /// Row creation time; the overdue clock starts here.
    pub created_at: DateTime<Utc>,
}
