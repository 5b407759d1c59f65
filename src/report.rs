//! Import outcome reporting.

use serde::{Deserialize, Serialize};

/// A non-fatal condition surfaced to the caller instead of being
/// silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportWarning {
    /// A transition named a target offer title that does not exist
    /// among the offers created for its chain; the edge was dropped.
    UnresolvedDependency {
        /// Chain whose group was being materialized.
        chain: String,
        /// Title of the offer the transition originates from.
        dependency: String,
        /// The referenced title that could not be resolved.
        target: String,
    },
    /// A marketing row carried offer slots but no chain title; its
    /// slots were skipped.
    RowWithoutChain {
        /// First offer code found on the row, for locating it.
        first_code: String,
    },
    /// A mail-plan row carried data but lacked a campaign code or a
    /// chain title; the row was skipped.
    IncompletePlanRow {
        /// Campaign code, when the row carried one.
        campaign: Option<String>,
        /// Chain title, when the row carried one.
        chain: Option<String>,
    },
}

/// Counters and warnings accumulated over one import invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Offers created.
    pub offers: usize,
    /// Chains created.
    pub chains: usize,
    /// Transition edges created.
    pub sequences: usize,
    /// Node-index rows created.
    pub chain_offers: usize,
    /// Campaigns created.
    pub campaigns: usize,
    /// Per-offer campaign rows created.
    pub campaign_offers: usize,
    /// Non-fatal conditions encountered.
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    /// Fold another report's counters and warnings into this one.
    pub fn merge(&mut self, other: ImportReport) {
        self.offers += other.offers;
        self.chains += other.chains;
        self.sequences += other.sequences;
        self.chain_offers += other.chain_offers;
        self.campaigns += other.campaigns;
        self.campaign_offers += other.campaign_offers;
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_counters_and_keeps_warnings() {
        let mut report = ImportReport {
            offers: 2,
            chains: 1,
            ..Default::default()
        };
        report.merge(ImportReport {
            offers: 3,
            campaigns: 1,
            warnings: vec![ImportWarning::RowWithoutChain {
                first_code: "A".to_string(),
            }],
            ..Default::default()
        });
        assert_eq!(report.offers, 5);
        assert_eq!(report.chains, 1);
        assert_eq!(report.campaigns, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    // Reports cross process boundaries as JSON in the admin tooling;
    // the shape is part of the contract.
    #[test]
    fn report_serializes_to_stable_json() {
        let report = ImportReport {
            offers: 1,
            warnings: vec![ImportWarning::UnresolvedDependency {
                chain: "X".to_string(),
                dependency: "A".to_string(),
                target: "B".to_string(),
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["offers"], 1);
        assert_eq!(json["warnings"][0]["UnresolvedDependency"]["chain"], "X");

        let back: ImportReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
