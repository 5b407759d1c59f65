//! Offer records.
//!
//! One offer is a single mailable unit (coupon, reminder, complaint
//! letter) inside a chain. Offers are created once per spreadsheet
//! row-slot and never mutated afterwards within one import.

use serde::{Deserialize, Serialize};

use super::OfferId;

/// An offer pending insertion, without an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOffer {
    /// Offer code from the sheet; unique within its chain group.
    pub title: String,
    /// Offer category (client service, no-payment letter, ...), taken
    /// from the slot's description column.
    #[serde(rename = "type")]
    pub offer_type: Option<String>,
    /// Free-text description (complaint, not recognized, ...).
    pub description: Option<String>,
    /// Mail carrier/porter.
    pub porter: Option<String>,
    /// Business owner of the offer.
    pub owner: Option<String>,
    /// Marketing theme.
    pub theme: Option<String>,
    /// Offer grade.
    pub grade: Option<String>,
    /// Target country, lowercased.
    pub country: Option<String>,
    /// Mailing language.
    pub language: Option<String>,
    /// Template version.
    pub version: Option<String>,
    /// Source/origin marker.
    pub origin: Option<String>,
}

impl NewOffer {
    /// Apply the field normalization every created offer must carry:
    /// lowercased country and a lowercased, dash-joined type.
    pub fn normalized(mut self) -> Self {
        if let Some(country) = self.country.take() {
            self.country = Some(country.trim().to_lowercase());
        }
        self.offer_type = self.offer_type.take().map(|t| normalize_offer_type(&t));
        self
    }
}

/// Normalize an offer type label: first space becomes a dash, result
/// is lowercased ("Client Service" -> "client-service").
pub fn normalize_offer_type(raw: &str) -> String {
    raw.trim().replacen(' ', "-", 1).to_lowercase()
}

/// A persisted offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Database identifier.
    pub id: OfferId,
    /// Offer code from the sheet.
    pub title: String,
    /// Offer category.
    #[serde(rename = "type")]
    pub offer_type: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Mail carrier/porter.
    pub porter: Option<String>,
    /// Business owner of the offer.
    pub owner: Option<String>,
    /// Marketing theme.
    pub theme: Option<String>,
    /// Offer grade.
    pub grade: Option<String>,
    /// Target country, lowercased.
    pub country: Option<String>,
    /// Mailing language.
    pub language: Option<String>,
    /// Template version.
    pub version: Option<String>,
    /// Source/origin marker.
    pub origin: Option<String>,
}

impl Offer {
    /// Attach an identifier to an insert record.
    pub fn from_new(id: OfferId, new: NewOffer) -> Self {
        Self {
            id,
            title: new.title,
            offer_type: new.offer_type,
            description: new.description,
            porter: new.porter,
            owner: new.owner,
            theme: new.theme,
            grade: new.grade,
            country: new.country,
            language: new.language,
            version: new.version,
            origin: new.origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(title: &str) -> NewOffer {
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

    #[test]
    fn normalization_lowercases_country_and_dashes_type() {
        let mut new = bare("A1");
        new.country = Some(" France ".to_string());
        new.offer_type = Some("Client Service".to_string());
        let new = new.normalized();
        assert_eq!(new.country.as_deref(), Some("france"));
        assert_eq!(new.offer_type.as_deref(), Some("client-service"));
    }

    #[test]
    fn only_first_space_becomes_dash() {
        assert_eq!(normalize_offer_type("No Payment Letter"), "no-payment letter");
        assert_eq!(normalize_offer_type("offer"), "offer");
    }
}
