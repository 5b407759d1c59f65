//! Identifier newtypes for persisted records.
//!
//! All identifiers are `i64` (BIGINT autoincrement in the relational
//! schema) and implement `Ord` for deterministic iteration in the
//! in-memory store and in tests.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            /// Create an id from a raw database value.
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the raw database value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

record_id!(
    /// Identifier of a persisted [`Offer`](super::Offer).
    OfferId
);
record_id!(
    /// Identifier of a persisted [`Chain`](super::Chain).
    ChainId
);
record_id!(
    /// Identifier of a persisted [`OfferSequence`](super::OfferSequence) edge.
    SequenceId
);
record_id!(
    /// Identifier of a persisted [`ChainOffer`](super::ChainOffer) node-index row.
    ChainOfferId
);
record_id!(
    /// Identifier of a deduplicated [`Address`](super::Address).
    AddressId
);
record_id!(
    /// Identifier of a deduplicated [`PayeeName`](super::PayeeName).
    PayeeNameId
);
record_id!(
    /// Identifier of a deduplicated [`PaymentMethod`](super::PaymentMethod).
    PaymentMethodId
);
record_id!(
    /// Identifier of a persisted [`Campaign`](super::Campaign).
    CampaignId
);
record_id!(
    /// Identifier of a persisted [`CampaignOffer`](super::CampaignOffer).
    CampaignOfferId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_raw_value() {
        let a = OfferId::new(1);
        let b = OfferId::new(2);
        assert!(a < b);
        assert_eq!(a.as_i64(), 1);
        assert_eq!(format!("{}", b), "2");
    }
}
