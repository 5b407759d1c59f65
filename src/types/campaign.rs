//! Campaign-side records: addresses, payees, payment methods,
//! campaigns and per-offer campaign rows.
//!
//! Addresses, payee names and payment methods are deduplicated by
//! unique-key upsert; campaigns and campaign offers are created once
//! per mailing event and may reference chains created by an earlier,
//! independent import run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AddressId, CampaignId, CampaignOfferId, ChainId, OfferId, PayeeNameId, PaymentMethodId};

/// Operational status of a PO-box address, derived from the sheet's
/// second warning column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressStatus {
    /// Address is in service.
    Normal,
    /// Address is closed for new mail.
    Closed,
}

impl AddressStatus {
    /// Derive the status from the raw warning text: a trimmed,
    /// case-insensitive `"normal"` keeps the address open, anything
    /// else closes it.
    pub fn from_warning(warning: Option<&str>) -> Self {
        match warning {
            Some(w) if w.trim().eq_ignore_ascii_case("normal") => Self::Normal,
            Some(_) => Self::Closed,
            None => Self::Normal,
        }
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Closed => "closed",
        }
    }
}

/// Error parsing a stored address status.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown address status {0:?}")]
pub struct ParseAddressStatusError(String);

impl std::str::FromStr for AddressStatus {
    type Err = ParseAddressStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "closed" => Ok(Self::Closed),
            other => Err(ParseAddressStatusError(other.to_string())),
        }
    }
}

/// An address pending upsert; the dedup key is the trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    /// PO-box text, trimmed.
    pub text: String,
    /// Country of the PO box, lowercased.
    pub country: Option<String>,
    /// First warning column.
    pub warning1: Option<String>,
    /// Second warning column; drives [`AddressStatus`].
    pub warning2: Option<String>,
    /// Derived status.
    pub status: AddressStatus,
}

/// A deduplicated, persisted address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Database identifier.
    pub id: AddressId,
    /// PO-box text, trimmed; unique.
    pub text: String,
    /// Country of the PO box, lowercased.
    pub country: Option<String>,
    /// First warning column.
    pub warning1: Option<String>,
    /// Second warning column.
    pub warning2: Option<String>,
    /// Derived status.
    pub status: AddressStatus,
}

impl Address {
    /// Attach an identifier to an upsert record.
    pub fn from_new(id: AddressId, new: NewAddress) -> Self {
        Self {
            id,
            text: new.text,
            country: new.country,
            warning1: new.warning1,
            warning2: new.warning2,
            status: new.status,
        }
    }
}

/// A deduplicated payee name (check recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeName {
    /// Database identifier.
    pub id: PayeeNameId,
    /// Trimmed name; unique.
    pub name: String,
}

/// A payment-method row pending upsert; the dedup key is
/// `(country, brand_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentMethod {
    /// Campaign country, lowercased.
    pub country: String,
    /// Owning brand, when known. The import sheets carry no brand.
    pub brand_id: Option<i64>,
    /// Accepted methods, lowercased ("cash", "check", ...).
    pub methods: Vec<String>,
}

/// A deduplicated, persisted payment-method row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Database identifier.
    pub id: PaymentMethodId,
    /// Campaign country, lowercased.
    pub country: String,
    /// Owning brand, when known.
    pub brand_id: Option<i64>,
    /// Accepted methods, lowercased.
    pub methods: Vec<String>,
}

impl PaymentMethod {
    /// Attach an identifier to an upsert record.
    pub fn from_new(id: PaymentMethodId, new: NewPaymentMethod) -> Self {
        Self {
            id,
            country: new.country,
            brand_id: new.brand_id,
            methods: new.methods,
        }
    }
}

/// A campaign pending insertion: one concrete mailing event tied to
/// one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
    /// Campaign code from the mail plan.
    pub code: String,
    /// Campaign country, lowercased.
    pub country: Option<String>,
    /// Chain being mailed.
    pub chain_id: ChainId,
    /// Extracted mail quantity, when already known.
    pub mail_quantity: Option<i64>,
    /// Planned mail date.
    pub mail_date: Option<NaiveDate>,
    /// Whether clients were already extracted for this campaign.
    pub is_extracted: bool,
}

/// A persisted campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Database identifier.
    pub id: CampaignId,
    /// Campaign code from the mail plan.
    pub code: String,
    /// Campaign country, lowercased.
    pub country: Option<String>,
    /// Chain being mailed.
    pub chain_id: ChainId,
    /// Extracted mail quantity, when already known.
    pub mail_quantity: Option<i64>,
    /// Planned mail date.
    pub mail_date: Option<NaiveDate>,
    /// Whether clients were already extracted for this campaign.
    pub is_extracted: bool,
}

impl Campaign {
    /// Attach an identifier to an insert record.
    pub fn from_new(id: CampaignId, new: NewCampaign) -> Self {
        Self {
            id,
            code: new.code,
            country: new.country,
            chain_id: new.chain_id,
            mail_quantity: new.mail_quantity,
            mail_date: new.mail_date,
            is_extracted: new.is_extracted,
        }
    }
}

/// A per-offer campaign row pending insertion. This is what drives
/// per-offer printing: each offer of the chain gets its own return
/// address, payee and currency for the given mailing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaignOffer {
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Offer of the chain this row prints.
    pub offer_id: OfferId,
    /// Payee for checks, when the plan names one.
    pub payee_name_id: Option<PayeeNameId>,
    /// Return address: the main mailing address for the entry offer,
    /// the chain-level address for every other offer.
    pub return_address_id: Option<AddressId>,
    /// Printer name from the plan.
    pub printer: Option<String>,
    /// Currency symbol derived from the campaign country.
    pub currency: String,
    /// Fixed print cost; zero until priced.
    pub fixed_cost: i64,
}

/// A persisted per-offer campaign row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignOffer {
    /// Database identifier.
    pub id: CampaignOfferId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Offer of the chain this row prints.
    pub offer_id: OfferId,
    /// Payee for checks.
    pub payee_name_id: Option<PayeeNameId>,
    /// Return address for this offer in this mailing.
    pub return_address_id: Option<AddressId>,
    /// Printer name from the plan.
    pub printer: Option<String>,
    /// Currency symbol derived from the campaign country.
    pub currency: String,
    /// Fixed print cost.
    pub fixed_cost: i64,
}

impl CampaignOffer {
    /// Attach an identifier to an insert record.
    pub fn from_new(id: CampaignOfferId, new: NewCampaignOffer) -> Self {
        Self {
            id,
            campaign_id: new.campaign_id,
            offer_id: new.offer_id,
            payee_name_id: new.payee_name_id,
            return_address_id: new.return_address_id,
            printer: new.printer,
            currency: new.currency,
            fixed_cost: new.fixed_cost,
        }
    }
}
