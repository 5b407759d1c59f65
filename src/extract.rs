//! Offer & transition extractor.
//!
//! Turns marketing-sheet rows into offer slot definitions and a
//! title-keyed adjacency of pending transitions. The adjacency and the
//! chain groups live in one [`Extraction`] value built per pass and
//! handed to the materializer explicitly; nothing is ambient.
//!
//! Dependency names are offer titles, and the row declaring the
//! dependency may sit anywhere in the sheet, so the transition map
//! spans the whole pass rather than a single row or batch.

use std::collections::HashMap;

use crate::currency::normalize_country;
use crate::reader::Row;
use crate::report::ImportWarning;
use crate::schema::marketing;
use crate::types::NewOffer;

/// One pending transition target: the offer code the dependency leads
/// to, and the day offset before it activates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    /// Destination offer code.
    pub code: String,
    /// Days before the destination offer activates.
    pub days_to_add: i32,
}

/// Title-keyed adjacency of pending transitions.
///
/// Titles are interned to indices so repeated dependency names share
/// one entry; every recorded target is kept, which is what makes
/// branching chains possible.
#[derive(Debug, Default)]
pub struct TransitionMap {
    titles: HashMap<String, usize>,
    targets: Vec<Vec<PendingTransition>>,
}

impl TransitionMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one `dependency title -> {code, days}` transition.
    /// Repeated titles accumulate targets instead of replacing them.
    pub fn record(&mut self, dependency_title: &str, code: String, days_to_add: i32) {
        let slot = match self.titles.get(dependency_title) {
            Some(&i) => i,
            None => {
                let i = self.targets.len();
                self.titles.insert(dependency_title.to_string(), i);
                self.targets.push(Vec::new());
                i
            }
        };
        self.targets[slot].push(PendingTransition { code, days_to_add });
    }

    /// Targets recorded under a dependency title.
    pub fn targets_of(&self, title: &str) -> Option<&[PendingTransition]> {
        self.titles
            .get(title)
            .map(|&i| self.targets[i].as_slice())
    }

    /// Number of distinct dependency titles.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no transition was recorded.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// All offers of one chain, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferGroup {
    /// Chain title from the sheet.
    pub chain_title: String,
    /// Offers in slot order; rows sharing the title append in row
    /// order.
    pub offers: Vec<NewOffer>,
}

/// Accumulator for one extraction pass over the marketing sheet.
#[derive(Debug, Default)]
pub struct Extraction {
    transitions: TransitionMap,
    groups: Vec<OfferGroup>,
    group_index: HashMap<String, usize>,
    warnings: Vec<ImportWarning>,
}

impl Extraction {
    /// Fresh accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one batch of rows.
    pub fn absorb_batch(&mut self, rows: &[Row]) {
        for row in rows {
            self.absorb_row(row);
        }
    }

    /// Absorb one marketing row: collect its offer slots, record its
    /// pending transitions, and merge the slots into the row's chain
    /// group.
    pub fn absorb_row(&mut self, row: &Row) {
        let chain_title = row.text(marketing::CHAIN);
        let country = row
            .text(marketing::COUNTRY)
            .and_then(|c| normalize_country(&c));

        let mut slots: Vec<NewOffer> = Vec::new();
        // Transitions stay buffered until the row passes the chain
        // gate; a skipped row must not leave edges behind that could
        // rewire another chain sharing its titles.
        let mut pending: Vec<(String, String, i32)> = Vec::new();
        for n in 1..=marketing::OFFER_SLOTS {
            let Some(code) = row.text(&marketing::code_offer(n)) else {
                continue;
            };
            let offer_type = row.text(&marketing::description_offer(n));
            let days_to_add = row
                .integer(&marketing::date_of_generation(n))
                .unwrap_or(0) as i32;

            if let Some(dependency) = row.text(&marketing::dependency_offer(n)) {
                pending.push((dependency, code.clone(), days_to_add));
            }

            slots.push(
                NewOffer {
                    title: code,
                    offer_type,
                    description: None,
                    porter: row.text(marketing::PORTER),
                    owner: row.text(marketing::OWNER),
                    theme: row.text(marketing::THEME),
                    grade: row.text(marketing::GRADE),
                    country: country.clone(),
                    language: row.text(marketing::LANGUAGE),
                    version: row.text(marketing::VERSION),
                    origin: row.text(marketing::ORIGIN),
                }
                .normalized(),
            );
        }

        if slots.is_empty() {
            return;
        }

        let Some(chain_title) = chain_title else {
            tracing::warn!(
                first_code = %slots[0].title,
                "marketing row carries offers but no chain title; skipping its slots"
            );
            self.warnings.push(ImportWarning::RowWithoutChain {
                first_code: slots[0].title.clone(),
            });
            return;
        };

        for (dependency, code, days_to_add) in pending {
            self.transitions.record(&dependency, code, days_to_add);
        }

        match self.group_index.get(&chain_title) {
            Some(&i) => self.groups[i].offers.extend(slots),
            None => {
                self.group_index.insert(chain_title.clone(), self.groups.len());
                self.groups.push(OfferGroup {
                    chain_title,
                    offers: slots,
                });
            }
        }
    }

    /// Chain groups in first-seen order.
    pub fn groups(&self) -> &[OfferGroup] {
        &self.groups
    }

    /// The pass-wide transition map.
    pub fn transitions(&self) -> &TransitionMap {
        &self.transitions
    }

    /// Decompose into groups, transition map and extraction warnings.
    pub fn into_parts(self) -> (Vec<OfferGroup>, TransitionMap, Vec<ImportWarning>) {
        (self.groups, self.transitions, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CellValue;

    fn marketing_row(pairs: &[(&str, &str)]) -> Row {
        Row::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), CellValue::Text(v.to_string()))),
        )
    }

    #[test]
    fn slots_collect_in_order_with_types() {
        let mut extraction = Extraction::new();
        extraction.absorb_row(&marketing_row(&[
            ("Chain", "X"),
            ("Country", "France"),
            ("Code Offer 1", "A"),
            ("Description Offer 1", "Client Service"),
            ("Code Offer 2", "B"),
        ]));

        let groups = extraction.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].chain_title, "X");
        let titles: Vec<_> = groups[0].offers.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
        assert_eq!(groups[0].offers[0].offer_type.as_deref(), Some("client-service"));
        assert_eq!(groups[0].offers[0].country.as_deref(), Some("france"));
    }

    #[test]
    fn repeated_dependency_titles_keep_all_targets() {
        let mut extraction = Extraction::new();
        extraction.absorb_row(&marketing_row(&[
            ("Chain", "X"),
            ("Code Offer 1", "A"),
            ("Code Offer 2", "B"),
            ("Dependency Offer 2", "A"),
            ("Code Offer 3", "C"),
            ("Dependency Offer 3", "A"),
        ]));

        let targets = extraction.transitions().targets_of("A").unwrap();
        let codes: Vec<_> = targets.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, ["B", "C"]);
    }

    #[test]
    fn rows_sharing_a_chain_title_merge_into_one_group() {
        let mut extraction = Extraction::new();
        extraction.absorb_row(&marketing_row(&[("Chain", "X"), ("Code Offer 1", "A")]));
        extraction.absorb_row(&marketing_row(&[("Chain", "Y"), ("Code Offer 1", "M")]));
        extraction.absorb_row(&marketing_row(&[("Chain", "X"), ("Code Offer 1", "B")]));

        let groups = extraction.groups();
        assert_eq!(groups.len(), 2);
        let x: Vec<_> = groups[0].offers.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(x, ["A", "B"]);
    }

    #[test]
    fn days_to_add_rides_the_dependency() {
        let mut extraction = Extraction::new();
        let mut row = marketing_row(&[
            ("Chain", "X"),
            ("Code Offer 1", "A"),
            ("Code Offer 2", "B"),
            ("Dependency Offer 2", "A"),
        ]);
        row.insert("Date of generation 2", CellValue::Number(5.0));
        extraction.absorb_row(&row);

        let targets = extraction.transitions().targets_of("A").unwrap();
        assert_eq!(targets[0].days_to_add, 5);
    }

    #[test]
    fn chainless_row_leaves_no_transitions_behind() {
        let mut extraction = Extraction::new();
        extraction.absorb_row(&marketing_row(&[
            ("Code Offer 1", "B"),
            ("Dependency Offer 1", "A"),
        ]));

        // Skipping the row discards its transitions too; another chain
        // with an offer titled "A" must not pick up this edge.
        assert!(extraction.transitions().is_empty());
        assert!(extraction.transitions().targets_of("A").is_none());
    }

    #[test]
    fn chainless_row_is_skipped_with_warning() {
        let mut extraction = Extraction::new();
        extraction.absorb_row(&marketing_row(&[("Code Offer 1", "A")]));

        assert!(extraction.groups().is_empty());
        let (_, _, warnings) = extraction.into_parts();
        assert_eq!(
            warnings,
            vec![ImportWarning::RowWithoutChain {
                first_code: "A".to_string()
            }]
        );
    }
}
