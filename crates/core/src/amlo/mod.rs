//! AMLO compliance pipeline.
//!
//! Reservations move through a four-state audit lifecycle; approved
//! reservations emit report rows that are batch-submitted to the regulator.
//! The PDF side is data-driven: a CSV field map associates business fields
//! with template widget names, the mapper flattens a reservation into
//! widget values, and the filler turns those into drawing operations.

pub mod error;
pub mod fieldmap;
pub mod filler;
pub mod mapper;
pub mod overdue;
pub mod report_no;
pub mod state;
pub mod types;

#[cfg(test)]
mod state_props;

pub use error::AmloError;
pub use fieldmap::{FieldKind, FieldMap, FieldSpec};
pub use filler::{fill_report, FillOp};
pub use mapper::map_fields;
pub use overdue::{age_days, classify, OverdueClass};
pub use report_no::format_report_no;
pub use state::{AuditAction, ReservationStatus};
pub use types::{AmloReport, ReportType, Reservation};
