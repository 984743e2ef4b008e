//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `BranchId` where an
//! `OperatorId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(BranchId, "Unique identifier for a branch.");
typed_id!(CurrencyId, "Unique identifier for a currency.");
typed_id!(RateId, "Unique identifier for a daily rate.");
typed_id!(LedgerEntryId, "Unique identifier for a ledger entry.");
typed_id!(EodStatusId, "Unique identifier for an EOD workflow instance.");
typed_id!(ReservationId, "Unique identifier for an AMLO reservation.");
typed_id!(AmloReportId, "Unique identifier for an AMLO report.");
typed_id!(OperatorId, "Unique identifier for an operator (user).");
typed_id!(
    BusinessGroupId,
    "Identifier shared by ledger rows split from one customer operation."
);
