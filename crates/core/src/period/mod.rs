//! Business-period state machine and window derivation.
//!
//! A branch moves through initial setup, open trading, and EOD processing.
//! The active period's time window is derived from the EOD history on every
//! read; it is never stored on individual ledger rows and it is never the
//! calendar day.

pub mod error;
pub mod state;
pub mod window;

pub use error::PeriodError;
pub use state::{assert_mutable, BranchState};
pub use window::{derive_window, PeriodInputs, PeriodWindow};
