//! Graph & sequence materializer.
//!
//! Takes one chain's offer group plus the pass-wide transition map and
//! persists the chain, its offers, its transition edges and its
//! breadth-first node index, all inside the caller's transaction.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::extract::{OfferGroup, TransitionMap};
use crate::report::ImportWarning;
use crate::store::ImportStore;
use crate::types::{Chain, NewChainOffer, NewOfferSequence, OfferId};

/// What materializing one group produced.
#[derive(Debug, Clone)]
pub struct GroupOutcome {
    /// The created chain, root sequence already set.
    pub chain: Chain,
    /// Offers created for the chain.
    pub offers: usize,
    /// Transition edges created.
    pub sequences: usize,
    /// Node-index rows created.
    pub chain_offers: usize,
}

/// Persist one chain group: offers, chain, transition edges, root
/// pointer, and the breadth-first node index.
///
/// The first offer of the group is the chain's entry offer; the first
/// created edge originates from it and becomes the chain's root
/// sequence. Transitions whose target code is not among the group's
/// offers are dropped with an [`ImportWarning::UnresolvedDependency`].
/// A group with no offers is a no-op.
pub async fn materialize_group<S: ImportStore>(
    store: &S,
    tx: &mut S::Tx,
    group: OfferGroup,
    transitions: &TransitionMap,
    warnings: &mut Vec<ImportWarning>,
) -> Result<Option<GroupOutcome>, S::Error> {
    if group.offers.is_empty() {
        return Ok(None);
    }

    let chain_title = group.chain_title;
    let offers = store.create_offers(tx, group.offers).await?;

    // Resolve the title-keyed adjacency to identifiers. Duplicate
    // titles within a group resolve to their first occurrence.
    let mut by_title: HashMap<&str, OfferId> = HashMap::new();
    for offer in &offers {
        by_title.entry(offer.title.as_str()).or_insert(offer.id);
    }

    let mut successors: HashMap<OfferId, Vec<(OfferId, i32)>> = HashMap::new();
    for offer in &offers {
        let Some(targets) = transitions.targets_of(&offer.title) else {
            continue;
        };
        for target in targets {
            match by_title.get(target.code.as_str()) {
                Some(&next) => {
                    successors
                        .entry(offer.id)
                        .or_default()
                        .push((next, target.days_to_add));
                }
                None => {
                    tracing::warn!(
                        chain = %chain_title,
                        dependency = %offer.title,
                        target = %target.code,
                        "transition target not found among the chain's offers; dropping edge"
                    );
                    warnings.push(ImportWarning::UnresolvedDependency {
                        chain: chain_title.clone(),
                        dependency: offer.title.clone(),
                        target: target.code.clone(),
                    });
                }
            }
        }
    }

    let chain = store.create_chain(tx, &chain_title).await?;

    let mut edges: Vec<NewOfferSequence> = Vec::new();
    for offer in &offers {
        match successors.get(&offer.id) {
            Some(targets) if !targets.is_empty() => {
                for &(next, days) in targets {
                    edges.push(NewOfferSequence::to_next(chain.id, offer.id, next, days));
                }
            }
            _ => edges.push(NewOfferSequence::terminal(chain.id, offer.id)),
        }
    }

    let sequences = store.create_sequences(tx, edges).await?;
    // Non-empty by construction: every offer contributed at least one edge.
    let root = &sequences[0];
    store.set_chain_root(tx, chain.id, root.id).await?;
    let chain = Chain {
        root_sequence_id: Some(root.id),
        ..chain
    };

    // Breadth-first levels from the entry offer, 1-based. A visited set
    // keeps converging or cyclic transitions from re-indexing a node.
    let mut visited: HashSet<OfferId> = HashSet::new();
    let mut queue: VecDeque<(OfferId, i32)> = VecDeque::new();
    let mut index_rows: Vec<NewChainOffer> = Vec::new();
    queue.push_back((root.current_offer_id, 1));
    visited.insert(root.current_offer_id);
    while let Some((offer_id, level)) = queue.pop_front() {
        index_rows.push(NewChainOffer {
            chain_id: chain.id,
            offer_id,
            index: level,
        });
        if let Some(targets) = successors.get(&offer_id) {
            for &(next, _) in targets {
                if visited.insert(next) {
                    queue.push_back((next, level + 1));
                }
            }
        }
    }

    let chain_offers = store.create_chain_offers(tx, index_rows).await?;

    tracing::debug!(
        chain = %chain.title,
        offers = offers.len(),
        sequences = sequences.len(),
        chain_offers = chain_offers.len(),
        "materialized chain group"
    );

    Ok(Some(GroupOutcome {
        chain,
        offers: offers.len(),
        sequences: sequences.len(),
        chain_offers: chain_offers.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryImportStore;
    use crate::types::NewOffer;

    fn offer(title: &str) -> NewOffer {
        NewOffer {
            title: title.to_string(),
            offer_type: None,
            description: None,
            porter: None,
            owner: None,
            theme: None,
            grade: None,
            country: None,
            language: None,
            version: None,
            origin: None,
        }
    }

    fn group(chain: &str, titles: &[&str]) -> OfferGroup {
        OfferGroup {
            chain_title: chain.to_string(),
            offers: titles.iter().map(|t| offer(t)).collect(),
        }
    }

    #[tokio::test]
    async fn empty_group_is_a_no_op() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut warnings = Vec::new();

        let outcome = materialize_group(
            &store,
            &mut tx,
            group("X", &[]),
            &TransitionMap::new(),
            &mut warnings,
        )
        .await
        .unwrap();

        assert!(outcome.is_none());
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn linear_chain_gets_levels_and_terminal_edge() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut warnings = Vec::new();

        let mut transitions = TransitionMap::new();
        transitions.record("A", "B".to_string(), 5);

        let outcome = materialize_group(
            &store,
            &mut tx,
            group("X", &["A", "B"]),
            &transitions,
            &mut warnings,
        )
        .await
        .unwrap()
        .unwrap();
        store.commit(tx).await.unwrap();

        assert_eq!(outcome.offers, 2);
        assert_eq!(outcome.sequences, 2);
        assert_eq!(outcome.chain_offers, 2);

        let tables = store.snapshot();
        let a = tables.offers.iter().find(|o| o.title == "A").unwrap().id;
        let b = tables.offers.iter().find(|o| o.title == "B").unwrap().id;

        let a_edge = tables
            .sequences
            .iter()
            .find(|s| s.current_offer_id == a)
            .unwrap();
        assert_eq!(a_edge.next_offer_id, Some(b));
        assert_eq!(a_edge.days_to_add, 5);

        let b_edge = tables
            .sequences
            .iter()
            .find(|s| s.current_offer_id == b)
            .unwrap();
        assert!(b_edge.is_terminal());

        let chain = &tables.chains[0];
        assert_eq!(chain.root_sequence_id, Some(a_edge.id));

        let levels: Vec<_> = tables
            .chain_offers
            .iter()
            .map(|c| (c.offer_id, c.index))
            .collect();
        assert_eq!(levels, vec![(a, 1), (b, 2)]);
    }

    #[tokio::test]
    async fn branching_targets_share_a_level() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut warnings = Vec::new();

        let mut transitions = TransitionMap::new();
        transitions.record("A", "B".to_string(), 3);
        transitions.record("A", "C".to_string(), 7);

        materialize_group(
            &store,
            &mut tx,
            group("X", &["A", "B", "C"]),
            &transitions,
            &mut warnings,
        )
        .await
        .unwrap()
        .unwrap();
        store.commit(tx).await.unwrap();

        let tables = store.snapshot();
        let index_of = |title: &str| {
            let id = tables.offers.iter().find(|o| o.title == title).unwrap().id;
            tables
                .chain_offers
                .iter()
                .find(|c| c.offer_id == id)
                .unwrap()
                .index
        };
        assert_eq!(index_of("A"), 1);
        assert_eq!(index_of("B"), 2);
        assert_eq!(index_of("C"), 2);
    }

    #[tokio::test]
    async fn unresolved_target_drops_edge_with_warning() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut warnings = Vec::new();

        let mut transitions = TransitionMap::new();
        transitions.record("A", "MISSING".to_string(), 2);

        let outcome = materialize_group(
            &store,
            &mut tx,
            group("X", &["A"]),
            &transitions,
            &mut warnings,
        )
        .await
        .unwrap()
        .unwrap();
        store.commit(tx).await.unwrap();

        // The dangling transition is dropped and A becomes terminal.
        assert_eq!(outcome.sequences, 1);
        assert!(store.snapshot().sequences[0].is_terminal());
        assert_eq!(
            warnings,
            vec![ImportWarning::UnresolvedDependency {
                chain: "X".to_string(),
                dependency: "A".to_string(),
                target: "MISSING".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn cycles_do_not_reindex_visited_offers() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut warnings = Vec::new();

        let mut transitions = TransitionMap::new();
        transitions.record("A", "B".to_string(), 1);
        transitions.record("B", "A".to_string(), 1);

        let outcome = materialize_group(
            &store,
            &mut tx,
            group("X", &["A", "B"]),
            &transitions,
            &mut warnings,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(outcome.chain_offers, 2);
    }
}
