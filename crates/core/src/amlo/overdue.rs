//! Overdue detection for unreported rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendering classification of an unreported row's age. The engine itself
/// only computes the age; these thresholds are presentation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdueClass {
    /// Within the grace window.
    OnTime,
    /// More than one day old.
    Overdue,
    /// More than three days old.
    MustReportImmediately,
}

/// Whole days elapsed since the report row was created.
#[must_use]
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

/// Classifies an age for rendering.
#[must_use]
pub const fn classify(age_days: i64) -> OverdueClass {
    if age_days > 3 {
        OverdueClass::MustReportImmediately
    } else if age_days > 1 {
        OverdueClass::Overdue
    } else {
        OverdueClass::OnTime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_age_floors_to_whole_days() {
        let created = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
        assert_eq!(age_days(created, created + Duration::hours(47)), 1);
        assert_eq!(age_days(created, created + Duration::hours(48)), 2);
    }

    #[test]
    fn test_age_never_negative() {
        let created = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
        assert_eq!(age_days(created, created - Duration::hours(5)), 0);
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(classify(0), OverdueClass::OnTime);
        assert_eq!(classify(1), OverdueClass::OnTime);
        assert_eq!(classify(2), OverdueClass::Overdue);
        assert_eq!(classify(3), OverdueClass::Overdue);
        assert_eq!(classify(4), OverdueClass::MustReportImmediately);
    }

    // Age is non-decreasing over wall-clock time.
    #[test]
    fn test_age_monotone() {
        let created = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
        let mut last = 0;
        for hours in (0..240).step_by(7) {
            let age = age_days(created, created + Duration::hours(hours));
            assert!(age >= last);
            last = age;
        }
    }
}
