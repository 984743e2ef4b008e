//! Report number formatting.

use chrono::Datelike;
use chrono::NaiveDate;

/// Formats the number printed into the form's pre-printed digit boxes:
/// `<3-digit institution>-<3-digit branch>-<2-digit Buddhist-year
/// suffix>-<serial><currency?>`. Each segment is right-zero-padded to its
/// width, matching the regulator's legacy convention.
#[must_use]
pub fn format_report_no(
    institution: &str,
    branch_code: &str,
    date: NaiveDate,
    serial: u32,
    currency: Option<&str>,
) -> String {
    let buddhist_year = date.year() + 543;
    let year_suffix = (buddhist_year.rem_euclid(100)).to_string();
    let mut out = format!(
        "{institution:0<3}-{branch_code:0<3}-{year_suffix:0<2}-{serial}",
    );
    if let Some(currency) = currency {
        out.push_str(currency);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_right_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        // 2026 CE = 2569 BE, suffix 69.
        assert_eq!(format_report_no("7", "B1", date, 12, None), "700-B10-69-12");
    }

    #[test]
    fn test_currency_tail() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        assert_eq!(
            format_report_no("700", "012", date, 5, Some("USD")),
            "700-012-69-5USD"
        );
    }

    #[test]
    fn test_full_width_segments_unchanged() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        // 2025 CE = 2568 BE.
        assert_eq!(format_report_no("123", "456", date, 7, None), "123-456-68-7");
    }
}
