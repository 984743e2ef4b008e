//! Business-period window derivation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Facts the window derivation needs, gathered by the repository layer.
#[derive(Debug, Clone, Copy)]
pub struct PeriodInputs {
    /// `completed_at` of the latest completed EOD for the branch.
    pub last_completed_at: Option<DateTime<Utc>>,
    /// `created_at` of the branch's earliest ledger entry.
    pub earliest_entry_at: Option<DateTime<Utc>>,
    /// `business_end_time` of the in-progress EOD, when one exists.
    pub active_eod_end: Option<DateTime<Utc>>,
    /// Wall-clock now.
    pub now: DateTime<Utc>,
}

/// The half-open time window of the branch's current business period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

/// Derives the current business-period window.
///
/// The start is one second past the last completed EOD, falling back to the
/// branch's first ledger entry, falling back to midnight of today. The end
/// is the in-progress EOD's frozen end time, or now. Two calendar days may
/// belong to the same period when EOD was skipped.
#[must_use]
pub fn derive_window(inputs: PeriodInputs) -> PeriodWindow {
    let start = inputs
        .last_completed_at
        .map(|t| t + Duration::seconds(1))
        .or(inputs.earliest_entry_at)
        .unwrap_or_else(|| {
            inputs
                .now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc()
        });
    let end = inputs.active_eod_end.unwrap_or(inputs.now);
    PeriodWindow { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_start_follows_completed_eod_plus_one_second() {
        let window = derive_window(PeriodInputs {
            last_completed_at: Some(ts(25, 18, 0)),
            earliest_entry_at: Some(ts(20, 9, 0)),
            active_eod_end: None,
            now: ts(26, 12, 0),
        });
        assert_eq!(window.start, ts(25, 18, 0) + Duration::seconds(1));
        assert_eq!(window.end, ts(26, 12, 0));
    }

    #[test]
    fn test_start_falls_back_to_first_entry() {
        let window = derive_window(PeriodInputs {
            last_completed_at: None,
            earliest_entry_at: Some(ts(20, 9, 30)),
            active_eod_end: None,
            now: ts(26, 12, 0),
        });
        assert_eq!(window.start, ts(20, 9, 30));
    }

    #[test]
    fn test_start_falls_back_to_midnight() {
        let window = derive_window(PeriodInputs {
            last_completed_at: None,
            earliest_entry_at: None,
            active_eod_end: None,
            now: ts(26, 12, 0),
        });
        assert_eq!(window.start, ts(26, 0, 0));
    }

    #[test]
    fn test_end_frozen_by_active_eod() {
        let window = derive_window(PeriodInputs {
            last_completed_at: Some(ts(25, 18, 0)),
            earliest_entry_at: None,
            active_eod_end: Some(ts(26, 17, 45)),
            now: ts(26, 18, 30),
        });
        assert_eq!(window.end, ts(26, 17, 45));
    }

    // A period spans two calendar days when EOD was skipped.
    #[test]
    fn test_window_crosses_calendar_days() {
        let window = derive_window(PeriodInputs {
            last_completed_at: Some(ts(24, 18, 0)),
            earliest_entry_at: None,
            active_eod_end: None,
            now: ts(26, 10, 0),
        });
        assert!(window.end - window.start > Duration::hours(24));
    }
}
