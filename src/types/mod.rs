//! Core record types for the import pipeline.

pub mod id;
pub mod offer;
pub mod chain;
pub mod campaign;

pub use id::{
    OfferId, ChainId, SequenceId, ChainOfferId, AddressId, PayeeNameId, PaymentMethodId,
    CampaignId, CampaignOfferId,
};
pub use offer::{Offer, NewOffer};
pub use chain::{Chain, OfferSequence, NewOfferSequence, ChainOffer, NewChainOffer, TERMINAL_DAYS_TO_ADD};
pub use campaign::{
    Address, NewAddress, AddressStatus, ParseAddressStatusError, PayeeName, PaymentMethod,
    NewPaymentMethod, Campaign, NewCampaign, CampaignOffer, NewCampaignOffer,
};
