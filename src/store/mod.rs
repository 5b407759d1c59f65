//! Persistence backends for the import pipeline.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;

use crate::types::{
    Address, Campaign, Chain, ChainId, ChainOffer, NewAddress, NewCampaign, NewCampaignOffer,
    NewChainOffer, NewOffer, NewOfferSequence, NewPaymentMethod, Offer, OfferSequence, PayeeName,
    PaymentMethod, SequenceId,
};

/// Trait for the storage collaborator of the import pipeline.
///
/// All mutations take an explicit transaction handle; one import
/// invocation runs under one logical transaction, either supplied by
/// the caller or opened by the pipeline itself. The upserts must carry
/// true unique-constraint semantics (insert-or-fetch-existing) — the
/// dedup steps of the campaign pass rely on them.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;
    /// Transaction handle type.
    type Tx: Send;

    /// Open a transaction.
    async fn begin(&self) -> Result<Self::Tx, Self::Error>;
    /// Commit a transaction.
    async fn commit(&self, tx: Self::Tx) -> Result<(), Self::Error>;
    /// Roll a transaction back.
    async fn rollback(&self, tx: Self::Tx) -> Result<(), Self::Error>;

    /// Batch-create offers, returning them with identifiers in input
    /// order.
    async fn create_offers(
        &self,
        tx: &mut Self::Tx,
        offers: Vec<NewOffer>,
    ) -> Result<Vec<Offer>, Self::Error>;

    /// Create a chain with no root sequence yet.
    async fn create_chain(&self, tx: &mut Self::Tx, title: &str) -> Result<Chain, Self::Error>;

    /// Point a chain at its root sequence edge.
    async fn set_chain_root(
        &self,
        tx: &mut Self::Tx,
        chain_id: ChainId,
        root: SequenceId,
    ) -> Result<(), Self::Error>;

    /// Batch-create transition edges, returning them with identifiers
    /// in input order.
    async fn create_sequences(
        &self,
        tx: &mut Self::Tx,
        sequences: Vec<NewOfferSequence>,
    ) -> Result<Vec<OfferSequence>, Self::Error>;

    /// Batch-create node-index rows; `(chain_id, offer_id)` is unique.
    async fn create_chain_offers(
        &self,
        tx: &mut Self::Tx,
        chain_offers: Vec<NewChainOffer>,
    ) -> Result<Vec<ChainOffer>, Self::Error>;

    /// Find a chain by its exact title.
    async fn find_chain_by_title(
        &self,
        tx: &mut Self::Tx,
        title: &str,
    ) -> Result<Option<Chain>, Self::Error>;

    /// All node-index rows of a chain, ordered by index ascending.
    async fn chain_offers_ordered(
        &self,
        tx: &mut Self::Tx,
        chain_id: ChainId,
    ) -> Result<Vec<ChainOffer>, Self::Error>;

    /// Insert-or-update an address keyed by its trimmed text.
    async fn upsert_address(
        &self,
        tx: &mut Self::Tx,
        address: NewAddress,
    ) -> Result<Address, Self::Error>;

    /// Insert-or-fetch a payee by trimmed name.
    async fn upsert_payee_name(
        &self,
        tx: &mut Self::Tx,
        name: &str,
    ) -> Result<PayeeName, Self::Error>;

    /// Insert-or-update a payment-method row keyed by
    /// `(country, brand_id)`.
    async fn upsert_payment_method(
        &self,
        tx: &mut Self::Tx,
        method: NewPaymentMethod,
    ) -> Result<PaymentMethod, Self::Error>;

    /// Create a campaign.
    async fn create_campaign(
        &self,
        tx: &mut Self::Tx,
        campaign: NewCampaign,
    ) -> Result<Campaign, Self::Error>;

    /// Batch-create per-offer campaign rows.
    async fn create_campaign_offers(
        &self,
        tx: &mut Self::Tx,
        campaign_offers: Vec<NewCampaignOffer>,
    ) -> Result<(), Self::Error>;
}

pub use memory::InMemoryImportStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresImportStore;
