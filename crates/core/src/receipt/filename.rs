//! Receipt filename and path layout.

use chrono::{Datelike, NaiveDate};

use satang_shared::Language;

/// `<transaction_no>[_<lang>].pdf`; the default language carries no suffix.
#[must_use]
pub fn receipt_filename(transaction_no: &str, language: Language) -> String {
    match language.filename_suffix() {
        Some(suffix) => format!("{transaction_no}_{suffix}.pdf"),
        None => format!("{transaction_no}.pdf"),
    }
}

/// `<first_transaction_no>_MULTI.pdf` for a dual-direction group.
#[must_use]
pub fn group_receipt_filename(first_transaction_no: &str) -> String {
    format!("{first_transaction_no}_MULTI.pdf")
}

/// Relative storage path: `receipts/<YYYY>/<MM>/<filename>`.
#[must_use]
pub fn receipt_path(date: NaiveDate, filename: &str) -> String {
    format!("receipts/{:04}/{:02}/{filename}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language_has_no_suffix() {
        assert_eq!(
            receipt_filename("BKK01-20260826-0007", Language::Th),
            "BKK01-20260826-0007.pdf"
        );
    }

    #[test]
    fn test_language_suffix() {
        assert_eq!(
            receipt_filename("BKK01-20260826-0007", Language::En),
            "BKK01-20260826-0007_en.pdf"
        );
        assert_eq!(
            receipt_filename("BKK01-20260826-0007", Language::Zh),
            "BKK01-20260826-0007_zh.pdf"
        );
    }

    #[test]
    fn test_group_filename() {
        assert_eq!(
            group_receipt_filename("BKK01-20260826-0007"),
            "BKK01-20260826-0007_MULTI.pdf"
        );
    }

    #[test]
    fn test_path_layout() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        assert_eq!(
            receipt_path(date, "BKK01-20260826-0007.pdf"),
            "receipts/2026/08/BKK01-20260826-0007.pdf"
        );
    }
}
