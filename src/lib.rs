//! # offer-chain-import
//!
//! Spreadsheet import pipeline for mail-order offer chains.
//!
//! The importer answers one question:
//!
//! > Given a planning workbook, which offers, chains, transition edges
//! > and campaigns does it define, and in what breadth-first order?
//!
//! ## Core Contract
//!
//! 1. Stream a worksheet as header-tagged row batches, validated
//!    against a fixed column vocabulary before any write
//! 2. Extract offer slots and a title-keyed transition adjacency, then
//!    materialize each chain with its edges and 1-based breadth-first
//!    node index
//! 3. Link mail-plan rows to the materialized chains as campaigns, with
//!    addresses, payees and payment methods deduplicated by upsert
//!
//! ## Architecture
//!
//! ```text
//! Workbook → SheetReader → Extraction → materialize_group ─┐
//!                        → link_campaign_batch ────────────┤
//!                                                          ↓
//!                                   ImportStore (Postgres or Memory)
//! ```
//!
//! ## Atomicity
//!
//! - One import invocation runs under one transaction: the caller's,
//!   or one the pipeline opens, commits and rolls back itself
//! - A failed pass leaves no partial rows behind
//! - Non-fatal conditions surface as [`report::ImportWarning`]s on the
//!   returned [`report::ImportReport`] instead of being dropped

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod campaign;
pub mod currency;
pub mod extract;
pub mod materialize;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod schema;
pub mod store;
pub mod types;

// Re-exports
pub use types::{
    Address, AddressId, AddressStatus, Campaign, CampaignId, CampaignOffer, CampaignOfferId,
    Chain, ChainId, ChainOffer, ChainOfferId, NewAddress, NewCampaign, NewCampaignOffer,
    NewChainOffer, NewOffer, NewOfferSequence, NewPaymentMethod, Offer, OfferId, OfferSequence,
    PayeeName, PayeeNameId, PaymentMethod, PaymentMethodId, SequenceId, TERMINAL_DAYS_TO_ADD,
};
pub use extract::{Extraction, OfferGroup, PendingTransition, TransitionMap};
pub use materialize::{materialize_group, GroupOutcome};
pub use campaign::{link_campaign_batch, CampaignError, MailPlanRow};
pub use pipeline::{
    import_campaign_plan, import_offer_graph, import_workbook, run_campaign_import,
    run_offer_import, ImportError, ImportOptions,
};
pub use reader::{
    CellValue, ReadError, ReadOptions, Row, RowBatch, RowSource, SheetReader, StaticSource,
    TypeHint,
};
pub use report::{ImportReport, ImportWarning};
pub use schema::SchemaError;
pub use store::{ImportStore, InMemoryImportStore};
#[cfg(feature = "postgres")]
pub use store::postgres::{PostgresConfig, PostgresImportStore, IMPORT_TABLE_SCHEMA};
