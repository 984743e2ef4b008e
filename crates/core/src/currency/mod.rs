//! Decimal money handling and the base/foreign movement split.

pub mod movement;
pub mod rounding;

pub use movement::Movement;
pub use rounding::{round_amount, round_local};
