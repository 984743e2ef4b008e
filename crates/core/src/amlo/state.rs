//! Reservation lifecycle.

use serde::{Deserialize, Serialize};

use super::error::AmloError;

/// Audit lifecycle of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Awaiting audit.
    Pending,
    /// Audit approved; a report row exists.
    Approved,
    /// Audit rejected with a reason.
    Rejected,
    /// The underlying trade was finalised.
    Completed,
}

/// Auditor decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Approve the reservation.
    Approve,
    /// Reject the reservation.
    Reject,
}

impl ReservationStatus {
    /// Applies an audit decision. Only pending reservations can be audited;
    /// rejections must carry a reason.
    pub fn audit(
        self,
        action: AuditAction,
        rejection_reason: Option<&str>,
    ) -> Result<Self, AmloError> {
        let to = match action {
            AuditAction::Approve => Self::Approved,
            AuditAction::Reject => Self::Rejected,
        };
        if self != Self::Pending {
            return Err(AmloError::InvalidTransition { from: self, to });
        }
        if action == AuditAction::Reject
            && rejection_reason.is_none_or(|r| r.trim().is_empty())
        {
            return Err(AmloError::MissingRejectionReason);
        }
        Ok(to)
    }

    /// Returns an audited reservation to pending. The caller must delete
    /// the companion report row when reversing an approval.
    pub fn reverse_audit(self) -> Result<Self, AmloError> {
        match self {
            Self::Approved | Self::Rejected => Ok(Self::Pending),
            Self::Pending | Self::Completed => Err(AmloError::InvalidTransition {
                from: self,
                to: Self::Pending,
            }),
        }
    }

    /// Marks the underlying trade finalised. Only approved reservations
    /// complete.
    pub fn complete(self) -> Result<Self, AmloError> {
        match self {
            Self::Approved => Ok(Self::Completed),
            _ => Err(AmloError::InvalidTransition {
                from: self,
                to: Self::Completed,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_from_pending() {
        assert_eq!(
            ReservationStatus::Pending
                .audit(AuditAction::Approve, None)
                .unwrap(),
            ReservationStatus::Approved
        );
        assert_eq!(
            ReservationStatus::Pending
                .audit(AuditAction::Reject, Some("id mismatch"))
                .unwrap(),
            ReservationStatus::Rejected
        );
    }

    #[test]
    fn test_reject_needs_reason() {
        assert!(matches!(
            ReservationStatus::Pending.audit(AuditAction::Reject, None),
            Err(AmloError::MissingRejectionReason)
        ));
        assert!(matches!(
            ReservationStatus::Pending.audit(AuditAction::Reject, Some("  ")),
            Err(AmloError::MissingRejectionReason)
        ));
    }

    #[test]
    fn test_audit_only_from_pending() {
        for status in [
            ReservationStatus::Approved,
            ReservationStatus::Rejected,
            ReservationStatus::Completed,
        ] {
            assert!(status.audit(AuditAction::Approve, None).is_err());
        }
    }

    #[test]
    fn test_reverse_audit_edges() {
        assert_eq!(
            ReservationStatus::Approved.reverse_audit().unwrap(),
            ReservationStatus::Pending
        );
        assert_eq!(
            ReservationStatus::Rejected.reverse_audit().unwrap(),
            ReservationStatus::Pending
        );
        assert!(ReservationStatus::Pending.reverse_audit().is_err());
        assert!(ReservationStatus::Completed.reverse_audit().is_err());
    }

    #[test]
    fn test_complete_only_from_approved() {
        assert_eq!(
            ReservationStatus::Approved.complete().unwrap(),
            ReservationStatus::Completed
        );
        assert!(ReservationStatus::Pending.complete().is_err());
        assert!(ReservationStatus::Rejected.complete().is_err());
        assert!(ReservationStatus::Completed.complete().is_err());
    }
}
