//! CSV-driven widget field maps.
//!
//! Each regulator template ships with a CSV describing its form widgets.
//! The CSV is authoritative; nothing about widget names or kinds is
//! hard-coded in the filler.

use serde::Deserialize;

use super::error::AmloError;
use super::types::ReportType;

/// How a widget is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Overlay-drawn text.
    Text,
    /// Form-value checkbox.
    Checkbox,
    /// Characters spaced across pre-printed digit boxes.
    ReportNo,
    /// Embedded signature image.
    Signature,
}

/// One row of the field map CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    /// Regulator form code this row belongs to.
    pub report_type: String,
    /// Business field name, matching `form_data` keys.
    pub field: String,
    /// Widget name inside the template PDF.
    pub widget: String,
    /// Fill strategy.
    pub kind: FieldKind,
    /// Zero-based template page.
    pub page: u32,
}

/// The parsed field map for one report type.
#[derive(Debug, Clone)]
pub struct FieldMap {
    /// Specs in CSV order.
    pub specs: Vec<FieldSpec>,
}

impl FieldMap {
    /// Loads the map for one report type from CSV bytes.
    ///
    /// Rows for other report types are skipped so all three templates can
    /// share one file.
    pub fn load(report_type: ReportType, csv_bytes: &[u8]) -> Result<Self, AmloError> {
        let mut reader = csv::Reader::from_reader(csv_bytes);
        let mut specs = Vec::new();
        for row in reader.deserialize::<FieldSpec>() {
            let spec = row?;
            if spec.report_type == report_type.code() {
                specs.push(spec);
            }
        }
        Ok(Self { specs })
    }

    /// Looks up a spec by business field name.
    #[must_use]
    pub fn spec_for(&self, field: &str) -> Option<&FieldSpec> {
        self.specs.iter().find(|s| s.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
report_type,field,widget,kind,page
AMLO-1-01,maker_name,txt_maker_name,text,0
AMLO-1-01,amount_thb,txt_amount,text,0
AMLO-1-01,is_cash,chk_cash,checkbox,0
AMLO-1-01,report_no,boxes_report_no,report_no,0
AMLO-1-01,customer_signature,sig_customer,signature,1
AMLO-1-02,maker_name,txt_maker,text,0
";

    #[test]
    fn test_load_filters_by_report_type() {
        let map = FieldMap::load(ReportType::Cash, SAMPLE.as_bytes()).unwrap();
        assert_eq!(map.specs.len(), 5);
        assert!(map.specs.iter().all(|s| s.report_type == "AMLO-1-01"));

        let property = FieldMap::load(ReportType::Property, SAMPLE.as_bytes()).unwrap();
        assert_eq!(property.specs.len(), 1);
        assert_eq!(property.specs[0].widget, "txt_maker");
    }

    #[test]
    fn test_kinds_parse() {
        let map = FieldMap::load(ReportType::Cash, SAMPLE.as_bytes()).unwrap();
        assert_eq!(map.spec_for("is_cash").unwrap().kind, FieldKind::Checkbox);
        assert_eq!(
            map.spec_for("report_no").unwrap().kind,
            FieldKind::ReportNo
        );
        assert_eq!(
            map.spec_for("customer_signature").unwrap().kind,
            FieldKind::Signature
        );
    }

    #[test]
    fn test_malformed_csv_is_an_error() {
        let bad = "report_type,field\nAMLO-1-01,maker_name\n";
        assert!(FieldMap::load(ReportType::Cash, bad.as_bytes()).is_err());
    }
}
