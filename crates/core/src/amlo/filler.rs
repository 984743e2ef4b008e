//! Template filling as data.
//!
//! The filler is a pure function of (field map, widget values, signatures)
//! to a list of drawing operations. Text widgets are overlay-drawn and the
//! page later flattened, so viewers without form support render correctly;
//! checkboxes update the underlying form value instead.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::Value;

use super::error::AmloError;
use super::fieldmap::{FieldKind, FieldMap};
use super::types::ReportType;
use crate::receipt::font::{detect_script, Font};

/// One drawing operation against the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOp {
    /// Overlay text at a widget's rectangle.
    DrawText {
        /// Widget name.
        widget: String,
        /// Zero-based page.
        page: u32,
        /// Text to draw.
        value: String,
        /// Script-appropriate font.
        font: Font,
        /// Point size after fitting.
        size: Decimal,
    },
    /// Set a checkbox form value.
    SetCheckbox {
        /// Widget name.
        widget: String,
        /// Zero-based page.
        page: u32,
        /// On or off.
        checked: bool,
    },
    /// Space characters across the pre-printed digit boxes.
    DrawBoxedChars {
        /// Widget name.
        widget: String,
        /// Zero-based page.
        page: u32,
        /// One character per box.
        chars: Vec<char>,
        /// Per-box x offsets from the widget origin, in points.
        offsets: Vec<Decimal>,
    },
    /// Insert a signature image at the widget's rectangle.
    DrawImage {
        /// Widget name.
        widget: String,
        /// Zero-based page.
        page: u32,
        /// Encoded image bytes.
        image: Vec<u8>,
    },
}

const BASE_FONT_SIZE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
const MIN_FONT_SIZE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Shrinks the font until the estimated text width fits the widget.
///
/// Glyph width is approximated as 0.6 of the point size, which is how the
/// templates were measured.
fn fit_size(text: &str, widget_width: Option<Decimal>) -> Decimal {
    let Some(width) = widget_width else {
        return BASE_FONT_SIZE;
    };
    let chars = Decimal::from(text.chars().count());
    let mut size = BASE_FONT_SIZE;
    while size > MIN_FONT_SIZE && chars * size * Decimal::new(6, 1) > width {
        size -= Decimal::new(5, 1);
    }
    size
}

/// Per-box x offsets for the report-number row, in points. Determined
/// empirically per template.
#[must_use]
pub fn box_offsets(report_type: ReportType) -> Vec<Decimal> {
    let step = match report_type {
        ReportType::Cash => Decimal::new(182, 1),
        ReportType::Property => Decimal::new(182, 1),
        ReportType::Suspicious => Decimal::new(176, 1),
    };
    (0..14).map(|i| step * Decimal::from(i)).collect()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn as_checked(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.as_str(), "true" | "on" | "yes" | "1"),
        _ => false,
    }
}

/// Produces the drawing operations for one report.
///
/// Missing optional values are skipped; a missing report number is an
/// error because the digit boxes must always be populated. Widget widths
/// come from the template metadata and are optional per widget.
pub fn fill_report(
    report_type: ReportType,
    map: &FieldMap,
    values: &BTreeMap<String, Value>,
    signatures: &BTreeMap<String, Vec<u8>>,
    widget_widths: &BTreeMap<String, Decimal>,
) -> Result<Vec<FillOp>, AmloError> {
    let mut ops = Vec::with_capacity(map.specs.len());
    for spec in &map.specs {
        match spec.kind {
            FieldKind::Text => {
                let Some(text) = values.get(&spec.field).and_then(as_text) else {
                    continue;
                };
                if text.is_empty() {
                    continue;
                }
                let size = fit_size(&text, widget_widths.get(&spec.widget).copied());
                ops.push(FillOp::DrawText {
                    widget: spec.widget.clone(),
                    page: spec.page,
                    font: detect_script(&text),
                    value: text,
                    size,
                });
            }
            FieldKind::Checkbox => {
                let checked = values.get(&spec.field).map(as_checked).unwrap_or(false);
                ops.push(FillOp::SetCheckbox {
                    widget: spec.widget.clone(),
                    page: spec.page,
                    checked,
                });
            }
            FieldKind::ReportNo => {
                let text = values
                    .get(&spec.field)
                    .and_then(as_text)
                    .ok_or_else(|| AmloError::MissingFieldValue(spec.widget.clone()))?;
                let chars: Vec<char> = text.chars().collect();
                let offsets = box_offsets(report_type)
                    .into_iter()
                    .take(chars.len())
                    .collect();
                ops.push(FillOp::DrawBoxedChars {
                    widget: spec.widget.clone(),
                    page: spec.page,
                    chars,
                    offsets,
                });
            }
            FieldKind::Signature => {
                if let Some(image) = signatures.get(&spec.field) {
                    ops.push(FillOp::DrawImage {
                        widget: spec.widget.clone(),
                        page: spec.page,
                        image: image.clone(),
                    });
                }
            }
        }
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = "\
report_type,field,widget,kind,page
AMLO-1-01,maker_name,txt_maker_name,text,0
AMLO-1-01,is_cash,chk_cash,checkbox,0
AMLO-1-01,report_no,boxes_report_no,report_no,0
AMLO-1-01,customer_signature,sig_customer,signature,1
";

    fn map() -> FieldMap {
        FieldMap::load(ReportType::Cash, SAMPLE.as_bytes()).unwrap()
    }

    fn base_values() -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("maker_name".to_string(), json!("Somchai P.")),
            ("is_cash".to_string(), json!(true)),
            ("report_no".to_string(), json!("700-012-69-5")),
        ])
    }

    #[test]
    fn test_fill_produces_one_op_per_present_widget() {
        let ops = fill_report(
            ReportType::Cash,
            &map(),
            &base_values(),
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .unwrap();
        // Text, checkbox, report-no; no signature supplied.
        assert_eq!(ops.len(), 3);
    }

    #[test]
    fn test_script_detection_picks_font() {
        let mut values = base_values();
        values.insert("maker_name".to_string(), json!("สมชาย"));
        let ops = fill_report(
            ReportType::Cash,
            &map(),
            &values,
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .unwrap();
        let font = ops
            .iter()
            .find_map(|op| match op {
                FillOp::DrawText { font, .. } => Some(*font),
                _ => None,
            })
            .unwrap();
        assert_eq!(font, Font::Thai);
    }

    #[test]
    fn test_font_shrinks_to_fit() {
        let narrow = BTreeMap::from([("txt_maker_name".to_string(), Decimal::new(40, 0))]);
        let ops = fill_report(
            ReportType::Cash,
            &map(),
            &base_values(),
            &BTreeMap::new(),
            &narrow,
        )
        .unwrap();
        let size = ops
            .iter()
            .find_map(|op| match op {
                FillOp::DrawText { size, .. } => Some(*size),
                _ => None,
            })
            .unwrap();
        assert!(size < Decimal::new(10, 0));
        assert!(size >= Decimal::new(5, 0));
    }

    #[test]
    fn test_report_no_boxes_spaced() {
        let ops = fill_report(
            ReportType::Cash,
            &map(),
            &base_values(),
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .unwrap();
        let (chars, offsets) = ops
            .iter()
            .find_map(|op| match op {
                FillOp::DrawBoxedChars { chars, offsets, .. } => Some((chars, offsets)),
                _ => None,
            })
            .unwrap();
        assert_eq!(chars.len(), offsets.len());
        assert!(offsets.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_missing_report_no_is_an_error() {
        let mut values = base_values();
        values.remove("report_no");
        assert!(matches!(
            fill_report(
                ReportType::Cash,
                &map(),
                &values,
                &BTreeMap::new(),
                &BTreeMap::new()
            ),
            Err(AmloError::MissingFieldValue(_))
        ));
    }

    #[test]
    fn test_signature_inserted_when_present() {
        let signatures =
            BTreeMap::from([("customer_signature".to_string(), vec![0x89, 0x50])]);
        let ops = fill_report(
            ReportType::Cash,
            &map(),
            &base_values(),
            &signatures,
            &BTreeMap::new(),
        )
        .unwrap();
        assert!(ops
            .iter()
            .any(|op| matches!(op, FillOp::DrawImage { page: 1, .. })));
    }
}
