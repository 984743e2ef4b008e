//! The drawing seam between renderers and the PDF backend.

use rust_decimal::Decimal;
use thiserror::Error;

use super::font::Font;

/// Raised by a canvas backend.
#[derive(Debug, Error)]
#[error("Canvas backend failed: {0}")]
pub struct CanvasError(pub String);

/// Drawing primitives the renderers need. Pages are A4 portrait; the
/// coordinate origin is the top-left corner, units are points.
pub trait Canvas {
    /// Draws text at (x, y).
    fn text(
        &mut self,
        x: Decimal,
        y: Decimal,
        value: &str,
        font: Font,
        size: Decimal,
    ) -> Result<(), CanvasError>;

    /// Strokes a rectangle.
    fn rect(
        &mut self,
        x: Decimal,
        y: Decimal,
        width: Decimal,
        height: Decimal,
    ) -> Result<(), CanvasError>;

    /// Draws a checkbox glyph, ticked or empty.
    fn checkbox(&mut self, x: Decimal, y: Decimal, checked: bool) -> Result<(), CanvasError>;

    /// Embeds an encoded image into a rectangle.
    fn image(
        &mut self,
        x: Decimal,
        y: Decimal,
        width: Decimal,
        height: Decimal,
        bytes: &[u8],
    ) -> Result<(), CanvasError>;

    /// Starts a new page.
    fn page_break(&mut self) -> Result<(), CanvasError>;
}

/// One recorded primitive, for asserting on renderer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOp {
    /// Text drawn.
    Text {
        /// X coordinate.
        x: Decimal,
        /// Y coordinate.
        y: Decimal,
        /// The string.
        value: String,
        /// Font chosen.
        font: Font,
        /// Point size.
        size: Decimal,
    },
    /// Rectangle stroked.
    Rect,
    /// Checkbox drawn.
    Checkbox {
        /// Ticked or empty.
        checked: bool,
    },
    /// Image embedded.
    Image,
    /// Page break.
    PageBreak,
}

/// A canvas that records every call; the test double for renderers.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    /// Primitives in call order.
    pub ops: Vec<RecordedOp>,
}

impl RecordingCanvas {
    /// All recorded text strings, in draw order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RecordedOp::Text { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True when any drawn string contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }
}

impl Canvas for RecordingCanvas {
    fn text(
        &mut self,
        x: Decimal,
        y: Decimal,
        value: &str,
        font: Font,
        size: Decimal,
    ) -> Result<(), CanvasError> {
        self.ops.push(RecordedOp::Text {
            x,
            y,
            value: value.to_string(),
            font,
            size,
        });
        Ok(())
    }

    fn rect(
        &mut self,
        _x: Decimal,
        _y: Decimal,
        _width: Decimal,
        _height: Decimal,
    ) -> Result<(), CanvasError> {
        self.ops.push(RecordedOp::Rect);
        Ok(())
    }

    fn checkbox(&mut self, _x: Decimal, _y: Decimal, checked: bool) -> Result<(), CanvasError> {
        self.ops.push(RecordedOp::Checkbox { checked });
        Ok(())
    }

    fn image(
        &mut self,
        _x: Decimal,
        _y: Decimal,
        _width: Decimal,
        _height: Decimal,
        _bytes: &[u8],
    ) -> Result<(), CanvasError> {
        self.ops.push(RecordedOp::Image);
        Ok(())
    }

    fn page_break(&mut self) -> Result<(), CanvasError> {
        self.ops.push(RecordedOp::PageBreak);
        Ok(())
    }
}
