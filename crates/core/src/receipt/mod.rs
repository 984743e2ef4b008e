//! Receipt and report rendering.
//!
//! Rendering goes through a `Canvas` abstraction so the PDF backend stays a
//! collaborator; the renderers are pure functions of the entry data and the
//! operator's language. Filenames follow the `receipts/<YYYY>/<MM>/` layout
//! with atomic write semantics handled by the storage layer.

pub mod canvas;
pub mod filename;
pub mod font;
pub mod render;

pub use canvas::{Canvas, CanvasError, RecordingCanvas, RecordedOp};
pub use filename::{group_receipt_filename, receipt_filename, receipt_path};
pub use font::{detect_script, Font};
pub use render::{render_eod_summary, render_exchange_receipt, render_reversal_receipt};
