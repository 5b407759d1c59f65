//! End-to-end import pipeline.
//!
//! Two passes share one workbook: the offer-graph pass drains the
//! marketing sheet, extracts offer groups plus the pass-wide transition
//! map, and materializes every chain; the campaign pass drains the
//! mail-plan sheet and links each row to its chain. Either pass runs
//! inside a caller-supplied transaction or opens, commits and rolls
//! back its own.

use std::path::Path;

use crate::campaign::{link_campaign_batch, CampaignError};
use crate::extract::Extraction;
use crate::materialize::materialize_group;
use crate::reader::{ReadError, ReadOptions, RowSource, SheetReader, TypeHint};
use crate::report::ImportReport;
use crate::schema::{self, mail_plan, marketing, SchemaError};
use crate::store::ImportStore;

/// Error type for an import invocation.
#[derive(Debug, thiserror::Error)]
pub enum ImportError<E: std::error::Error> {
    /// The source file or sheet could not be read.
    #[error(transparent)]
    Read(#[from] ReadError),
    /// The sheet's header row is missing required columns.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A mail-plan row names a chain that was never materialized. The
    /// surrounding transaction rolls back, so a plan against a missing
    /// chain leaves no partial campaigns behind.
    #[error("campaign {campaign:?} references unknown chain {chain:?}")]
    ChainNotFound {
        /// The unknown chain title.
        chain: String,
        /// Campaign code of the offending row.
        campaign: String,
    },
    /// The storage backend failed.
    #[error("store error: {0}")]
    Store(E),
}

impl<E: std::error::Error> From<CampaignError<E>> for ImportError<E> {
    fn from(err: CampaignError<E>) -> Self {
        match err {
            CampaignError::ChainNotFound { chain, campaign } => {
                Self::ChainNotFound { chain, campaign }
            }
            CampaignError::Store(e) => Self::Store(e),
        }
    }
}

/// How to open one source sheet.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Worksheet decoding options; batch size and header row are
    /// adjustable through here.
    pub read: ReadOptions,
}

impl ImportOptions {
    /// Options for the marketing (offer-graph) sheet.
    pub fn marketing() -> Self {
        Self {
            read: ReadOptions::new(marketing::SHEET),
        }
    }

    /// Options for the mail-plan (campaign) sheet. The mail-date
    /// column decodes as an Excel serial date.
    pub fn mail_plan() -> Self {
        Self {
            read: ReadOptions::new(mail_plan::SHEET)
                .with_hint(mail_plan::MAIL_DATE, TypeHint::SerialDate),
        }
    }
}

/// Run the offer-graph pass over an already opened row source.
///
/// The extraction spans the whole source before anything is
/// materialized, because a dependency may name an offer declared in a
/// later batch. When `tx` is `None` the pass runs in its own
/// transaction.
pub async fn run_offer_import<S, R>(
    store: &S,
    source: &mut R,
    tx: Option<&mut S::Tx>,
) -> Result<ImportReport, ImportError<S::Error>>
where
    S: ImportStore,
    R: RowSource,
{
    match tx {
        Some(tx) => offer_import_in_tx(store, source, tx).await,
        None => {
            let mut tx = store.begin().await.map_err(ImportError::Store)?;
            match offer_import_in_tx(store, source, &mut tx).await {
                Ok(report) => {
                    store.commit(tx).await.map_err(ImportError::Store)?;
                    Ok(report)
                }
                Err(err) => {
                    rollback_logged(store, tx).await;
                    Err(err)
                }
            }
        }
    }
}

/// Run the campaign pass over an already opened row source.
pub async fn run_campaign_import<S, R>(
    store: &S,
    source: &mut R,
    tx: Option<&mut S::Tx>,
) -> Result<ImportReport, ImportError<S::Error>>
where
    S: ImportStore,
    R: RowSource,
{
    match tx {
        Some(tx) => campaign_import_in_tx(store, source, tx).await,
        None => {
            let mut tx = store.begin().await.map_err(ImportError::Store)?;
            match campaign_import_in_tx(store, source, &mut tx).await {
                Ok(report) => {
                    store.commit(tx).await.map_err(ImportError::Store)?;
                    Ok(report)
                }
                Err(err) => {
                    rollback_logged(store, tx).await;
                    Err(err)
                }
            }
        }
    }
}

/// Offer-graph pass over one worksheet of the file at `path`.
pub async fn import_offer_graph<S: ImportStore>(
    store: &S,
    path: &Path,
    options: &ImportOptions,
    tx: Option<&mut S::Tx>,
) -> Result<ImportReport, ImportError<S::Error>> {
    let mut source = SheetReader::open(path, &options.read)?;
    run_offer_import(store, &mut source, tx).await
}

/// Campaign pass over one worksheet of the file at `path`.
pub async fn import_campaign_plan<S: ImportStore>(
    store: &S,
    path: &Path,
    options: &ImportOptions,
    tx: Option<&mut S::Tx>,
) -> Result<ImportReport, ImportError<S::Error>> {
    let mut source = SheetReader::open(path, &options.read)?;
    run_campaign_import(store, &mut source, tx).await
}

/// Both passes over one workbook, in one transaction: the offer graph
/// first, then the campaigns that reference it. Any failure rolls the
/// whole import back.
pub async fn import_workbook<S: ImportStore>(
    store: &S,
    path: &Path,
) -> Result<ImportReport, ImportError<S::Error>> {
    let mut tx = store.begin().await.map_err(ImportError::Store)?;
    match workbook_in_tx(store, path, &mut tx).await {
        Ok(report) => {
            store.commit(tx).await.map_err(ImportError::Store)?;
            Ok(report)
        }
        Err(err) => {
            rollback_logged(store, tx).await;
            Err(err)
        }
    }
}

async fn workbook_in_tx<S: ImportStore>(
    store: &S,
    path: &Path,
    tx: &mut S::Tx,
) -> Result<ImportReport, ImportError<S::Error>> {
    let mut report = {
        let mut source = SheetReader::open(path, &ImportOptions::marketing().read)?;
        offer_import_in_tx(store, &mut source, tx).await?
    };
    let mut source = SheetReader::open(path, &ImportOptions::mail_plan().read)?;
    report.merge(campaign_import_in_tx(store, &mut source, tx).await?);
    Ok(report)
}

async fn rollback_logged<S: ImportStore>(store: &S, tx: S::Tx) {
    if let Err(rollback_err) = store.rollback(tx).await {
        tracing::error!(error = %rollback_err, "rollback after failed import also failed");
    }
}

async fn offer_import_in_tx<S, R>(
    store: &S,
    source: &mut R,
    tx: &mut S::Tx,
) -> Result<ImportReport, ImportError<S::Error>>
where
    S: ImportStore,
    R: RowSource,
{
    let mut extraction = Extraction::new();
    while let Some(batch) = source.next_batch()? {
        if let Some(headers) = &batch.headers {
            schema::validate_headers(marketing::SHEET, headers, &marketing::required_columns())?;
        }
        extraction.absorb_batch(&batch.rows);
    }

    let (groups, transitions, mut warnings) = extraction.into_parts();

    let mut report = ImportReport::default();
    for group in groups {
        if let Some(outcome) =
            materialize_group(store, tx, group, &transitions, &mut warnings)
                .await
                .map_err(ImportError::Store)?
        {
            report.chains += 1;
            report.offers += outcome.offers;
            report.sequences += outcome.sequences;
            report.chain_offers += outcome.chain_offers;
        }
    }
    report.warnings = warnings;

    tracing::info!(
        chains = report.chains,
        offers = report.offers,
        sequences = report.sequences,
        chain_offers = report.chain_offers,
        warnings = report.warnings.len(),
        "offer-graph pass complete"
    );
    Ok(report)
}

async fn campaign_import_in_tx<S, R>(
    store: &S,
    source: &mut R,
    tx: &mut S::Tx,
) -> Result<ImportReport, ImportError<S::Error>>
where
    S: ImportStore,
    R: RowSource,
{
    let mut report = ImportReport::default();
    while let Some(batch) = source.next_batch()? {
        if let Some(headers) = &batch.headers {
            schema::validate_headers(mail_plan::SHEET, headers, &mail_plan::required_columns())?;
        }
        if !batch.rows.is_empty() {
            report.merge(link_campaign_batch(store, tx, &batch.rows).await?);
        }
    }

    tracing::info!(
        campaigns = report.campaigns,
        campaign_offers = report.campaign_offers,
        "campaign pass complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{CellValue, Row, RowBatch, StaticSource};
    use crate::store::{ImportStore, InMemoryImportStore};

    fn marketing_batchset(rows: Vec<Row>) -> StaticSource {
        StaticSource::new(vec![
            RowBatch::headers(marketing::required_columns()),
            RowBatch::rows(rows),
        ])
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        Row::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), CellValue::Text(v.to_string()))),
        )
    }

    #[tokio::test]
    async fn missing_column_fails_before_any_write() {
        let store = InMemoryImportStore::new();
        let headers: Vec<String> = marketing::required_columns()
            .into_iter()
            .filter(|c| c != marketing::CHAIN)
            .collect();
        let mut source = StaticSource::new(vec![
            RowBatch::headers(headers),
            RowBatch::rows(vec![row(&[("Code Offer 1", "A")])]),
        ]);

        let err = run_offer_import(&store, &mut source, None).await.unwrap_err();
        assert!(matches!(err, ImportError::Schema(_)));
        assert!(store.snapshot().offers.is_empty());
    }

    #[tokio::test]
    async fn dependency_across_batches_still_resolves() {
        let store = InMemoryImportStore::new();
        // The dependency row arrives a batch before the row declaring
        // its target; the pass-wide extraction must bridge them.
        let mut source = StaticSource::new(vec![
            RowBatch::headers(marketing::required_columns()),
            RowBatch::rows(vec![row(&[
                ("Chain", "X"),
                ("Code Offer 1", "A"),
            ])]),
            RowBatch::rows(vec![row(&[
                ("Chain", "X"),
                ("Code Offer 1", "B"),
                ("Dependency Offer 1", "A"),
            ])]),
        ]);

        let report = run_offer_import(&store, &mut source, None).await.unwrap();
        assert_eq!(report.chains, 1);
        assert_eq!(report.offers, 2);

        let tables = store.snapshot();
        let a = tables.offers.iter().find(|o| o.title == "A").unwrap().id;
        let edge = tables
            .sequences
            .iter()
            .find(|s| s.current_offer_id == a)
            .unwrap();
        assert!(edge.next_offer_id.is_some());
    }

    #[tokio::test]
    async fn owned_transaction_commits_on_success() {
        let store = InMemoryImportStore::new();
        let mut source = marketing_batchset(vec![row(&[("Chain", "X"), ("Code Offer 1", "A")])]);

        let report = run_offer_import(&store, &mut source, None).await.unwrap();
        assert_eq!(report.chains, 1);
        assert_eq!(store.snapshot().chains.len(), 1);
    }

    #[tokio::test]
    async fn caller_transaction_is_left_open() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut source = marketing_batchset(vec![row(&[("Chain", "X"), ("Code Offer 1", "A")])]);

        run_offer_import(&store, &mut source, Some(&mut tx))
            .await
            .unwrap();
        // Nothing is visible until the caller commits.
        assert!(store.snapshot().chains.is_empty());
        store.commit(tx).await.unwrap();
        assert_eq!(store.snapshot().chains.len(), 1);
    }
}
