//! Property tests for the reservation lifecycle.

use proptest::prelude::*;

use super::state::{AuditAction, ReservationStatus};

#[derive(Debug, Clone, Copy)]
enum Op {
    Approve,
    Reject,
    ReverseAudit,
    Complete,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Approve),
        Just(Op::Reject),
        Just(Op::ReverseAudit),
        Just(Op::Complete),
    ]
}

fn apply(status: ReservationStatus, op: Op) -> Result<ReservationStatus, ()> {
    match op {
        Op::Approve => status.audit(AuditAction::Approve, None).map_err(drop),
        Op::Reject => status.audit(AuditAction::Reject, Some("reason")).map_err(drop),
        Op::ReverseAudit => status.reverse_audit().map_err(drop),
        Op::Complete => status.complete().map_err(drop),
    }
}

proptest! {
    // Under any operation sequence: pending only reaches approved or
    // rejected; completed only follows approved; completed is terminal.
    #[test]
    fn lifecycle_edges_hold(ops in prop::collection::vec(arb_op(), 0..32)) {
        let mut status = ReservationStatus::Pending;
        for op in ops {
            let before = status;
            if let Ok(after) = apply(status, op) {
                match (before, after) {
                    (ReservationStatus::Pending, ReservationStatus::Approved | ReservationStatus::Rejected)
                    | (ReservationStatus::Approved, ReservationStatus::Completed)
                    | (ReservationStatus::Approved | ReservationStatus::Rejected, ReservationStatus::Pending) => {}
                    other => prop_assert!(false, "illegal edge {other:?}"),
                }
                status = after;
            } else {
                prop_assert_eq!(before, status);
            }
            if before == ReservationStatus::Completed {
                prop_assert_eq!(status, ReservationStatus::Completed);
            }
        }
    }
}
