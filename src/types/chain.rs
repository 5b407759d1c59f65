//! Chain, transition-edge and node-index records.
//!
//! A chain is a named, directed graph of offers. `OfferSequence` rows
//! are its transition edges (with a per-edge day offset before the next
//! offer activates); `ChainOffer` rows are a denormalized node index
//! keeping only the breadth-first order, for printing and export.
//! Queries that care about ordering join `ChainOffer`; queries that
//! care about the exact transitions join `OfferSequence`.

use serde::{Deserialize, Serialize};

use super::{ChainId, ChainOfferId, OfferId, SequenceId};

/// Sentinel day offset paired with a missing successor on terminal edges.
pub const TERMINAL_DAYS_TO_ADD: i32 = -1;

/// A persisted chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Database identifier.
    pub id: ChainId,
    /// Chain title from the sheet's "Chain" column.
    pub title: String,
    /// The sequence edge whose `current_offer_id` is the chain's entry
    /// offer. `None` only transiently, before the edges exist.
    pub root_sequence_id: Option<SequenceId>,
}

/// A transition edge pending insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOfferSequence {
    /// Owning chain.
    pub chain_id: ChainId,
    /// Source offer of the transition.
    pub current_offer_id: OfferId,
    /// Destination offer; `None` marks a terminal offer.
    pub next_offer_id: Option<OfferId>,
    /// Days to wait after the current offer before the next activates.
    /// [`TERMINAL_DAYS_TO_ADD`] when there is no successor.
    pub days_to_add: i32,
}

impl NewOfferSequence {
    /// Edge to a resolved successor.
    pub fn to_next(chain_id: ChainId, current: OfferId, next: OfferId, days_to_add: i32) -> Self {
        Self {
            chain_id,
            current_offer_id: current,
            next_offer_id: Some(next),
            days_to_add,
        }
    }

    /// Terminal edge for an offer with no successor.
    pub fn terminal(chain_id: ChainId, current: OfferId) -> Self {
        Self {
            chain_id,
            current_offer_id: current,
            next_offer_id: None,
            days_to_add: TERMINAL_DAYS_TO_ADD,
        }
    }

    /// Whether this edge marks a terminal offer.
    pub fn is_terminal(&self) -> bool {
        self.next_offer_id.is_none()
    }
}

/// A persisted transition edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSequence {
    /// Database identifier.
    pub id: SequenceId,
    /// Owning chain.
    pub chain_id: ChainId,
    /// Source offer of the transition.
    pub current_offer_id: OfferId,
    /// Destination offer; `None` marks a terminal offer.
    pub next_offer_id: Option<OfferId>,
    /// Day offset before the successor activates.
    pub days_to_add: i32,
}

impl OfferSequence {
    /// Attach an identifier to an insert record.
    pub fn from_new(id: SequenceId, new: NewOfferSequence) -> Self {
        Self {
            id,
            chain_id: new.chain_id,
            current_offer_id: new.current_offer_id,
            next_offer_id: new.next_offer_id,
            days_to_add: new.days_to_add,
        }
    }

    /// Whether this edge marks a terminal offer.
    pub fn is_terminal(&self) -> bool {
        self.next_offer_id.is_none()
    }
}

/// A node-index row pending insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChainOffer {
    /// Owning chain.
    pub chain_id: ChainId,
    /// Indexed offer.
    pub offer_id: OfferId,
    /// 1-based breadth-first depth from the chain's entry offer.
    pub index: i32,
}

/// A persisted node-index row, unique per `(chain_id, offer_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainOffer {
    /// Database identifier.
    pub id: ChainOfferId,
    /// Owning chain.
    pub chain_id: ChainId,
    /// Indexed offer.
    pub offer_id: OfferId,
    /// 1-based breadth-first depth from the chain's entry offer.
    pub index: i32,
}

impl ChainOffer {
    /// Attach an identifier to an insert record.
    pub fn from_new(id: ChainOfferId, new: NewChainOffer) -> Self {
        Self {
            id,
            chain_id: new.chain_id,
            offer_id: new.offer_id,
            index: new.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_edge_carries_sentinel_days() {
        let edge = NewOfferSequence::terminal(ChainId::new(1), OfferId::new(7));
        assert!(edge.is_terminal());
        assert_eq!(edge.days_to_add, TERMINAL_DAYS_TO_ADD);
    }

    #[test]
    fn next_edge_keeps_days() {
        let edge = NewOfferSequence::to_next(ChainId::new(1), OfferId::new(1), OfferId::new(2), 5);
        assert!(!edge.is_terminal());
        assert_eq!(edge.days_to_add, 5);
    }
}
