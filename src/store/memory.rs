//! In-memory import store for testing.
//!
//! Transactions are copy-on-begin: `begin` clones the table set, every
//! mutation works on the clone, and `commit` swaps it back in. A
//! dropped or rolled-back transaction therefore leaves the store
//! untouched, which is exactly the atomicity the pipeline's tests need
//! to observe.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::{
    Address, AddressId, Campaign, CampaignId, CampaignOffer, CampaignOfferId, Chain, ChainId,
    ChainOffer, ChainOfferId, NewAddress, NewCampaign, NewCampaignOffer, NewChainOffer, NewOffer,
    NewOfferSequence, NewPaymentMethod, Offer, OfferId, OfferSequence, PayeeName, PayeeNameId,
    PaymentMethod, PaymentMethodId, SequenceId,
};

use super::ImportStore;

/// Error type for the in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// A unique constraint was violated.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    /// A referenced chain does not exist.
    #[error("chain not found: {0}")]
    ChainMissing(ChainId),
}

/// The full table set. Cloned per transaction.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    next_id: i64,
    /// Persisted offers.
    pub offers: Vec<Offer>,
    /// Persisted chains.
    pub chains: Vec<Chain>,
    /// Persisted transition edges.
    pub sequences: Vec<OfferSequence>,
    /// Persisted node-index rows.
    pub chain_offers: Vec<ChainOffer>,
    /// Deduplicated addresses.
    pub addresses: Vec<Address>,
    /// Deduplicated payee names.
    pub payee_names: Vec<PayeeName>,
    /// Deduplicated payment methods.
    pub payment_methods: Vec<PaymentMethod>,
    /// Persisted campaigns.
    pub campaigns: Vec<Campaign>,
    /// Persisted per-offer campaign rows.
    pub campaign_offers: Vec<CampaignOffer>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Transaction handle: a private copy of the tables.
#[derive(Debug)]
pub struct MemoryTx {
    tables: Tables,
}

/// In-memory import store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryImportStore {
    inner: Arc<Mutex<Tables>>,
}

impl InMemoryImportStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the committed tables.
    pub fn snapshot(&self) -> Tables {
        self.inner.lock().clone()
    }
}

#[async_trait]
impl ImportStore for InMemoryImportStore {
    type Error = InMemoryError;
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, InMemoryError> {
        Ok(MemoryTx {
            tables: self.inner.lock().clone(),
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), InMemoryError> {
        *self.inner.lock() = tx.tables;
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<(), InMemoryError> {
        Ok(())
    }

    async fn create_offers(
        &self,
        tx: &mut MemoryTx,
        offers: Vec<NewOffer>,
    ) -> Result<Vec<Offer>, InMemoryError> {
        let mut created = Vec::with_capacity(offers.len());
        for new in offers {
            let id = OfferId::new(tx.tables.next_id());
            let offer = Offer::from_new(id, new);
            tx.tables.offers.push(offer.clone());
            created.push(offer);
        }
        Ok(created)
    }

    async fn create_chain(&self, tx: &mut MemoryTx, title: &str) -> Result<Chain, InMemoryError> {
        let chain = Chain {
            id: ChainId::new(tx.tables.next_id()),
            title: title.to_string(),
            root_sequence_id: None,
        };
        tx.tables.chains.push(chain.clone());
        Ok(chain)
    }

    async fn set_chain_root(
        &self,
        tx: &mut MemoryTx,
        chain_id: ChainId,
        root: SequenceId,
    ) -> Result<(), InMemoryError> {
        let chain = tx
            .tables
            .chains
            .iter_mut()
            .find(|c| c.id == chain_id)
            .ok_or(InMemoryError::ChainMissing(chain_id))?;
        chain.root_sequence_id = Some(root);
        Ok(())
    }

    async fn create_sequences(
        &self,
        tx: &mut MemoryTx,
        sequences: Vec<NewOfferSequence>,
    ) -> Result<Vec<OfferSequence>, InMemoryError> {
        let mut created = Vec::with_capacity(sequences.len());
        for new in sequences {
            let id = SequenceId::new(tx.tables.next_id());
            let sequence = OfferSequence::from_new(id, new);
            tx.tables.sequences.push(sequence.clone());
            created.push(sequence);
        }
        Ok(created)
    }

    async fn create_chain_offers(
        &self,
        tx: &mut MemoryTx,
        chain_offers: Vec<NewChainOffer>,
    ) -> Result<Vec<ChainOffer>, InMemoryError> {
        let mut created = Vec::with_capacity(chain_offers.len());
        for new in chain_offers {
            let duplicate = tx
                .tables
                .chain_offers
                .iter()
                .any(|c| c.chain_id == new.chain_id && c.offer_id == new.offer_id);
            if duplicate {
                return Err(InMemoryError::UniqueViolation(format!(
                    "chain_offers ({}, {})",
                    new.chain_id, new.offer_id
                )));
            }
            let row = ChainOffer::from_new(ChainOfferId::new(tx.tables.next_id()), new);
            tx.tables.chain_offers.push(row);
            created.push(row);
        }
        Ok(created)
    }

    async fn find_chain_by_title(
        &self,
        tx: &mut MemoryTx,
        title: &str,
    ) -> Result<Option<Chain>, InMemoryError> {
        Ok(tx.tables.chains.iter().find(|c| c.title == title).cloned())
    }

    async fn chain_offers_ordered(
        &self,
        tx: &mut MemoryTx,
        chain_id: ChainId,
    ) -> Result<Vec<ChainOffer>, InMemoryError> {
        let mut rows: Vec<ChainOffer> = tx
            .tables
            .chain_offers
            .iter()
            .filter(|c| c.chain_id == chain_id)
            .copied()
            .collect();
        rows.sort_by_key(|c| (c.index, c.id));
        Ok(rows)
    }

    async fn upsert_address(
        &self,
        tx: &mut MemoryTx,
        address: NewAddress,
    ) -> Result<Address, InMemoryError> {
        let key = address.text.trim().to_string();
        if let Some(existing) = tx
            .tables
            .addresses
            .iter_mut()
            .find(|a| a.text.trim() == key)
        {
            existing.country = address.country;
            existing.warning1 = address.warning1;
            existing.warning2 = address.warning2;
            existing.status = address.status;
            return Ok(existing.clone());
        }
        let row = Address::from_new(AddressId::new(tx.tables.next_id()), address);
        tx.tables.addresses.push(row.clone());
        Ok(row)
    }

    async fn upsert_payee_name(
        &self,
        tx: &mut MemoryTx,
        name: &str,
    ) -> Result<PayeeName, InMemoryError> {
        let trimmed = name.trim().to_string();
        if let Some(existing) = tx.tables.payee_names.iter().find(|p| p.name == trimmed) {
            return Ok(existing.clone());
        }
        let row = PayeeName {
            id: PayeeNameId::new(tx.tables.next_id()),
            name: trimmed,
        };
        tx.tables.payee_names.push(row.clone());
        Ok(row)
    }

    async fn upsert_payment_method(
        &self,
        tx: &mut MemoryTx,
        method: NewPaymentMethod,
    ) -> Result<PaymentMethod, InMemoryError> {
        if let Some(existing) = tx
            .tables
            .payment_methods
            .iter_mut()
            .find(|p| p.country == method.country && p.brand_id == method.brand_id)
        {
            existing.methods = method.methods;
            return Ok(existing.clone());
        }
        let row = PaymentMethod::from_new(PaymentMethodId::new(tx.tables.next_id()), method);
        tx.tables.payment_methods.push(row.clone());
        Ok(row)
    }

    async fn create_campaign(
        &self,
        tx: &mut MemoryTx,
        campaign: NewCampaign,
    ) -> Result<Campaign, InMemoryError> {
        let row = Campaign::from_new(CampaignId::new(tx.tables.next_id()), campaign);
        tx.tables.campaigns.push(row.clone());
        Ok(row)
    }

    async fn create_campaign_offers(
        &self,
        tx: &mut MemoryTx,
        campaign_offers: Vec<NewCampaignOffer>,
    ) -> Result<(), InMemoryError> {
        for new in campaign_offers {
            let row = CampaignOffer::from_new(CampaignOfferId::new(tx.tables.next_id()), new);
            tx.tables.campaign_offers.push(row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressStatus;

    fn address(text: &str) -> NewAddress {
        NewAddress {
            text: text.to_string(),
            country: Some("france".to_string()),
            warning1: None,
            warning2: None,
            status: AddressStatus::Normal,
        }
    }

    #[tokio::test]
    async fn commit_publishes_and_rollback_discards() {
        let store = InMemoryImportStore::new();

        let mut tx = store.begin().await.unwrap();
        store.create_chain(&mut tx, "X").await.unwrap();
        store.rollback(tx).await.unwrap();
        assert!(store.snapshot().chains.is_empty());

        let mut tx = store.begin().await.unwrap();
        store.create_chain(&mut tx, "X").await.unwrap();
        store.commit(tx).await.unwrap();
        assert_eq!(store.snapshot().chains.len(), 1);
    }

    #[tokio::test]
    async fn address_upsert_is_keyed_by_trimmed_text() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = store.upsert_address(&mut tx, address("PO Box 7")).await.unwrap();
        let second = store
            .upsert_address(&mut tx, address("  PO Box 7 "))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        store.commit(tx).await.unwrap();
        assert_eq!(store.snapshot().addresses.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_chain_offer_violates_unique_key() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();
        let chain = store.create_chain(&mut tx, "X").await.unwrap();

        let row = NewChainOffer {
            chain_id: chain.id,
            offer_id: OfferId::new(99),
            index: 1,
        };
        store.create_chain_offers(&mut tx, vec![row]).await.unwrap();
        let err = store
            .create_chain_offers(&mut tx, vec![row])
            .await
            .unwrap_err();
        assert!(matches!(err, InMemoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn payment_method_upsert_keyed_by_country_and_brand() {
        let store = InMemoryImportStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = store
            .upsert_payment_method(
                &mut tx,
                NewPaymentMethod {
                    country: "france".to_string(),
                    brand_id: None,
                    methods: vec!["cash".to_string()],
                },
            )
            .await
            .unwrap();
        let second = store
            .upsert_payment_method(
                &mut tx,
                NewPaymentMethod {
                    country: "france".to_string(),
                    brand_id: None,
                    methods: vec!["cash".to_string(), "check".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.methods.len(), 2);
    }
}
