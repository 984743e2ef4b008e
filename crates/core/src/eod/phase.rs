//! The settlement pipeline as a typed state machine.
//!
//! The persisted step integer is a storage artefact; domain code advances
//! through `EodPhase` via explicit transitions. A retry that observes an
//! already-advanced phase reports a no-op instead of re-executing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::EodError;

/// Where an in-progress settlement sits in the seven-step pipeline.
///
/// Each variant names the last step that has committed its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EodPhase {
    /// Step 1: branch frozen, window fixed.
    Frozen,
    /// Step 2: income report computed.
    IncomeReported,
    /// Step 3: stock report computed.
    StockReported,
    /// Step 4: physical counts verified, differences adjusted.
    Verified,
    /// Step 5: cash-out recorded.
    CashedOut,
    /// Step 6: snapshots persisted, summary rendered.
    Snapshotted,
    /// Step 7: settlement completed, branch reopened.
    Completed,
}

/// Terminal status of an EOD run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EodRunStatus {
    /// Pipeline still advancing.
    Processing,
    /// All seven steps done.
    Completed,
    /// Abandoned by the operator or an admin cleanup.
    Cancelled,
}

/// Outcome of an advance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The transition applied; side effects must run.
    Applied(EodPhase),
    /// A retry observed the step already done; skip side effects.
    NoOp,
}

impl EodPhase {
    /// The persisted step number (1-based).
    #[must_use]
    pub const fn step(self) -> i16 {
        match self {
            Self::Frozen => 1,
            Self::IncomeReported => 2,
            Self::StockReported => 3,
            Self::Verified => 4,
            Self::CashedOut => 5,
            Self::Snapshotted => 6,
            Self::Completed => 7,
        }
    }

    /// Reconstructs the phase from a persisted step number.
    #[must_use]
    pub const fn from_step(step: i16) -> Option<Self> {
        match step {
            1 => Some(Self::Frozen),
            2 => Some(Self::IncomeReported),
            3 => Some(Self::StockReported),
            4 => Some(Self::Verified),
            5 => Some(Self::CashedOut),
            6 => Some(Self::Snapshotted),
            7 => Some(Self::Completed),
            _ => None,
        }
    }

    const fn successor(self) -> Option<Self> {
        Self::from_step(self.step() + 1)
    }

    /// Attempts to advance to `requested`.
    ///
    /// Exactly-next steps apply; a step at or behind the current phase is an
    /// idempotent no-op; skipping ahead is refused.
    pub fn advance(self, requested: Self) -> Result<Advance, EodError> {
        if self == Self::Completed && requested != Self::Completed {
            return Err(EodError::AlreadyCompleted);
        }
        if requested <= self {
            return Ok(Advance::NoOp);
        }
        if self.successor() == Some(requested) {
            return Ok(Advance::Applied(requested));
        }
        Err(EodError::StepOutOfOrder {
            current: self,
            requested,
        })
    }
}

impl fmt::Display for EodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_round_trip() {
        for step in 1..=7 {
            let phase = EodPhase::from_step(step).unwrap();
            assert_eq!(phase.step(), step);
        }
        assert_eq!(EodPhase::from_step(0), None);
        assert_eq!(EodPhase::from_step(8), None);
    }

    #[test]
    fn test_advance_exactly_next() {
        assert_eq!(
            EodPhase::Frozen.advance(EodPhase::IncomeReported).unwrap(),
            Advance::Applied(EodPhase::IncomeReported)
        );
        assert_eq!(
            EodPhase::Snapshotted.advance(EodPhase::Completed).unwrap(),
            Advance::Applied(EodPhase::Completed)
        );
    }

    #[test]
    fn test_retry_is_noop() {
        assert_eq!(
            EodPhase::Verified.advance(EodPhase::Verified).unwrap(),
            Advance::NoOp
        );
        assert_eq!(
            EodPhase::Verified.advance(EodPhase::IncomeReported).unwrap(),
            Advance::NoOp
        );
    }

    #[test]
    fn test_skip_ahead_refused() {
        assert!(matches!(
            EodPhase::Frozen.advance(EodPhase::Verified),
            Err(EodError::StepOutOfOrder { .. })
        ));
    }

    #[test]
    fn test_completed_is_terminal() {
        assert!(matches!(
            EodPhase::Completed.advance(EodPhase::Frozen),
            Err(EodError::AlreadyCompleted)
        ));
        assert_eq!(
            EodPhase::Completed.advance(EodPhase::Completed).unwrap(),
            Advance::NoOp
        );
    }
}
