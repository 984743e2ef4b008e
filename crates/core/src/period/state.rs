//! Branch operating states and transitions.

use serde::{Deserialize, Serialize};

use super::error::PeriodError;

/// The four operating states of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchState {
    /// No initial balance has been set yet.
    NotInitialized,
    /// Normal trading.
    Open,
    /// An EOD settlement is running; mutations are gated.
    EodProcessing,
    /// Administratively frozen pending a data reset.
    LockedForReset,
}

impl BranchState {
    /// Derives the state from the persisted branch flags.
    #[must_use]
    pub const fn from_flags(
        initial_setup_completed: bool,
        eod_in_progress: bool,
        reset_locked: bool,
    ) -> Self {
        if reset_locked {
            Self::LockedForReset
        } else if !initial_setup_completed {
            Self::NotInitialized
        } else if eod_in_progress {
            Self::EodProcessing
        } else {
            Self::Open
        }
    }

    /// Validates the Open → EodProcessing transition.
    pub const fn check_start_eod(self) -> Result<(), PeriodError> {
        match self {
            Self::Open => Ok(()),
            Self::EodProcessing => Err(PeriodError::EodAlreadyRunning),
            Self::NotInitialized | Self::LockedForReset => Err(PeriodError::NotOpen),
        }
    }
}

/// The mutation gate consulted by exchanges, adjustments, and reversals.
///
/// During EOD only operators holding the override capability may mutate
/// balances; outside EOD any initialised branch is mutable.
pub const fn assert_mutable(state: BranchState, has_override: bool) -> Result<(), PeriodError> {
    match state {
        BranchState::Open => Ok(()),
        BranchState::EodProcessing => {
            if has_override {
                Ok(())
            } else {
                Err(PeriodError::Locked)
            }
        }
        BranchState::NotInitialized => Err(PeriodError::NotInitialized),
        BranchState::LockedForReset => Err(PeriodError::Locked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_flags() {
        assert_eq!(
            BranchState::from_flags(false, false, false),
            BranchState::NotInitialized
        );
        assert_eq!(BranchState::from_flags(true, false, false), BranchState::Open);
        assert_eq!(
            BranchState::from_flags(true, true, false),
            BranchState::EodProcessing
        );
        // Reset lock wins over everything else.
        assert_eq!(
            BranchState::from_flags(true, true, true),
            BranchState::LockedForReset
        );
    }

    #[test]
    fn test_start_eod_requires_open() {
        assert!(BranchState::Open.check_start_eod().is_ok());
        assert!(matches!(
            BranchState::EodProcessing.check_start_eod(),
            Err(PeriodError::EodAlreadyRunning)
        ));
        assert!(matches!(
            BranchState::NotInitialized.check_start_eod(),
            Err(PeriodError::NotOpen)
        ));
    }

    #[test]
    fn test_mutation_gate() {
        assert!(assert_mutable(BranchState::Open, false).is_ok());
        assert!(matches!(
            assert_mutable(BranchState::EodProcessing, false),
            Err(PeriodError::Locked)
        ));
        // Override capability passes the gate mid-EOD.
        assert!(assert_mutable(BranchState::EodProcessing, true).is_ok());
        assert!(matches!(
            assert_mutable(BranchState::NotInitialized, true),
            Err(PeriodError::NotInitialized)
        ));
        assert!(matches!(
            assert_mutable(BranchState::LockedForReset, true),
            Err(PeriodError::Locked)
        ));
    }
}
