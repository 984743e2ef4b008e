//! Byte encoding for rendered documents.
//!
//! The PDF backend proper is a print-service collaborator; the API persists
//! a deterministic draw-op stream that the backend replays. One primitive
//! per line, tab-separated, so the stored artefact diffs cleanly and the
//! same input always produces the same bytes.

use satang_core::amlo::FillOp;
use satang_core::receipt::{Canvas, CanvasError, Font};
use rust_decimal::Decimal;

const fn font_tag(font: Font) -> &'static str {
    match font {
        Font::Thai => "thai",
        Font::Cjk => "cjk",
        Font::Latin => "latin",
    }
}

/// Canvas backend that serializes primitives into a draw-op stream.
#[derive(Debug, Default)]
pub struct StreamCanvas {
    lines: Vec<String>,
    page: u32,
}

impl StreamCanvas {
    /// Creates an empty canvas positioned on page zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the canvas and returns the encoded stream.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out.into_bytes()
    }
}

impl Canvas for StreamCanvas {
    fn text(
        &mut self,
        x: Decimal,
        y: Decimal,
        value: &str,
        font: Font,
        size: Decimal,
    ) -> Result<(), CanvasError> {
        self.lines.push(format!(
            "text\t{}\t{x}\t{y}\t{}\t{size}\t{value}",
            self.page,
            font_tag(font),
        ));
        Ok(())
    }

    fn rect(
        &mut self,
        x: Decimal,
        y: Decimal,
        width: Decimal,
        height: Decimal,
    ) -> Result<(), CanvasError> {
        self.lines
            .push(format!("rect\t{}\t{x}\t{y}\t{width}\t{height}", self.page));
        Ok(())
    }

    fn checkbox(&mut self, x: Decimal, y: Decimal, checked: bool) -> Result<(), CanvasError> {
        self.lines
            .push(format!("checkbox\t{}\t{x}\t{y}\t{checked}", self.page));
        Ok(())
    }

    fn image(
        &mut self,
        x: Decimal,
        y: Decimal,
        width: Decimal,
        height: Decimal,
        bytes: &[u8],
    ) -> Result<(), CanvasError> {
        self.lines.push(format!(
            "image\t{}\t{x}\t{y}\t{width}\t{height}\t{}",
            self.page,
            bytes.len(),
        ));
        Ok(())
    }

    fn page_break(&mut self) -> Result<(), CanvasError> {
        self.page += 1;
        self.lines.push(format!("page\t{}", self.page));
        Ok(())
    }
}

/// Encodes AMLO template fill operations into the same stream format.
#[must_use]
pub fn encode_fill_ops(ops: &[FillOp]) -> Vec<u8> {
    let mut lines = Vec::with_capacity(ops.len());
    for op in ops {
        match op {
            FillOp::DrawText {
                widget,
                page,
                value,
                font,
                size,
            } => {
                lines.push(format!(
                    "fill_text\t{page}\t{widget}\t{}\t{size}\t{value}",
                    font_tag(*font),
                ));
            }
            FillOp::SetCheckbox {
                widget,
                page,
                checked,
            } => {
                lines.push(format!("fill_checkbox\t{page}\t{widget}\t{checked}"));
            }
            FillOp::DrawBoxedChars {
                widget,
                page,
                chars,
                offsets,
            } => {
                let chars: String = chars.iter().collect();
                let offsets: Vec<String> = offsets.iter().map(ToString::to_string).collect();
                lines.push(format!(
                    "fill_boxes\t{page}\t{widget}\t{chars}\t{}",
                    offsets.join(","),
                ));
            }
            FillOp::DrawImage {
                widget,
                page,
                image,
            } => {
                lines.push(format!("fill_image\t{page}\t{widget}\t{}", image.len()));
            }
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stream_is_deterministic() {
        let render = || {
            let mut canvas = StreamCanvas::new();
            canvas
                .text(dec!(40), dec!(40), "BKK01-20260826-0007", Font::Latin, dec!(10))
                .unwrap();
            canvas.page_break().unwrap();
            canvas.checkbox(dec!(10), dec!(10), true).unwrap();
            canvas.into_bytes()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_page_break_advances_page_column() {
        let mut canvas = StreamCanvas::new();
        canvas
            .text(dec!(0), dec!(0), "a", Font::Latin, dec!(10))
            .unwrap();
        canvas.page_break().unwrap();
        canvas
            .text(dec!(0), dec!(0), "b", Font::Thai, dec!(10))
            .unwrap();
        let stream = String::from_utf8(canvas.into_bytes()).unwrap();
        assert!(stream.contains("text\t0\t0\t0\tlatin\t10\ta"));
        assert!(stream.contains("text\t1\t0\t0\tthai\t10\tb"));
    }

    #[test]
    fn test_fill_ops_encoding() {
        let ops = vec![
            FillOp::SetCheckbox {
                widget: "chk_cash".to_string(),
                page: 0,
                checked: true,
            },
            FillOp::DrawBoxedChars {
                widget: "boxes_report_no".to_string(),
                page: 0,
                chars: vec!['7', '0', '0'],
                offsets: vec![dec!(0), dec!(18.2), dec!(36.4)],
            },
        ];
        let stream = String::from_utf8(encode_fill_ops(&ops)).unwrap();
        assert!(stream.contains("fill_checkbox\t0\tchk_cash\ttrue"));
        assert!(stream.contains("fill_boxes\t0\tboxes_report_no\t700\t0,18.2,36.4"));
    }
}
