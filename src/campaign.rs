//! Campaign linking pass.
//!
//! Reads mail-plan rows, deduplicates the address/payee/payment-method
//! reference data they carry, and links each row to its already
//! materialized chain as a campaign plus one row per chain offer.
//!
//! The pass works one batch at a time: a dedup pre-pass upserts the
//! batch's distinct reference rows once, then the campaign rows are
//! created sequentially so every row observes the upserted
//! identifiers.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::currency::{normalize_country, symbol_for};
use crate::reader::Row;
use crate::report::{ImportReport, ImportWarning};
use crate::schema::mail_plan;
use crate::store::ImportStore;
use crate::types::{
    AddressId, AddressStatus, NewAddress, NewCampaign, NewCampaignOffer, NewPaymentMethod,
    PayeeNameId,
};

/// Error raised by the linking pass.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError<E: std::error::Error> {
    /// A mail-plan row names a chain that was never materialized.
    #[error("campaign {campaign:?} references unknown chain {chain:?}")]
    ChainNotFound {
        /// The unknown chain title.
        chain: String,
        /// Campaign code of the offending row.
        campaign: String,
    },
    /// The storage backend failed.
    #[error(transparent)]
    Store(E),
}

/// One parsed mail-plan row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailPlanRow {
    /// Campaign code.
    pub code: String,
    /// Campaign country, normalized.
    pub country: Option<String>,
    /// Title of the chain being mailed.
    pub chain_title: String,
    /// Title of the offer named on the row, informational.
    pub offer_title: Option<String>,
    /// Printer name.
    pub printer: Option<String>,
    /// Extracted mail quantity, when the extraction already ran.
    pub mail_quantity: Option<i64>,
    /// Planned mail date.
    pub mail_date: Option<NaiveDate>,
    /// Payee for checks.
    pub payee: Option<String>,
    /// Accepted payment methods, split and lowercased.
    pub payment_methods: Vec<String>,
    /// Main-mailing return address.
    pub main_address: Option<NewAddress>,
    /// Chain-level return address for follow-up offers.
    pub chain_address: Option<NewAddress>,
}

impl MailPlanRow {
    /// Parse one sheet row. Returns `None` when the row carries no
    /// campaign code or no chain title, which is how the plan sheet
    /// spells "blank".
    pub fn parse(row: &Row) -> Option<Self> {
        let code = row.text(mail_plan::CAMPAIGN_CODE)?;
        let chain_title = row.text(mail_plan::CHAIN)?;

        Some(Self {
            code,
            country: row
                .text(mail_plan::COUNTRY)
                .and_then(|c| normalize_country(&c)),
            chain_title,
            offer_title: row.text(mail_plan::OFFER),
            printer: row.text(mail_plan::PRINTER),
            mail_quantity: row.integer(mail_plan::EXTRACTED_QTY),
            mail_date: row.date(mail_plan::MAIL_DATE),
            payee: row.text(mail_plan::PAYEE_NAME),
            payment_methods: row
                .text(mail_plan::PAYMENT_METHOD)
                .map(|raw| split_payment_methods(&raw))
                .unwrap_or_default(),
            main_address: parse_address(
                row,
                mail_plan::PO_BOX_MAIN,
                mail_plan::PO_BOX_MAIN_COUNTRY,
                mail_plan::WARNING_1,
                mail_plan::WARNING_2,
            ),
            chain_address: parse_address(
                row,
                mail_plan::PO_BOX_CHAIN,
                mail_plan::PO_BOX_CHAIN_COUNTRY,
                mail_plan::WARNING_1_CHAIN,
                mail_plan::WARNING_2_CHAIN,
            ),
        })
    }
}

fn parse_address(
    row: &Row,
    text_col: &str,
    country_col: &str,
    warning1_col: &str,
    warning2_col: &str,
) -> Option<NewAddress> {
    let text = row.text(text_col)?;
    let warning2 = row.text(warning2_col);
    Some(NewAddress {
        text: text.trim().to_string(),
        country: row.text(country_col).and_then(|c| normalize_country(&c)),
        warning1: row.text(warning1_col),
        status: AddressStatus::from_warning(warning2.as_deref()),
        warning2,
    })
}

/// Split a `"Cash + Check"`-style cell into lowercased method names.
pub fn split_payment_methods(raw: &str) -> Vec<String> {
    raw.split('+')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Link one batch of mail-plan rows.
///
/// The dedup pre-pass upserts each distinct address, payee and
/// payment-method row exactly once per batch; the unique keys make
/// repeats across batches converge on the same identifiers.
pub async fn link_campaign_batch<S: ImportStore>(
    store: &S,
    tx: &mut S::Tx,
    rows: &[Row],
) -> Result<ImportReport, CampaignError<S::Error>> {
    let mut report = ImportReport::default();

    let mut parsed: Vec<MailPlanRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match MailPlanRow::parse(row) {
            Some(plan_row) => parsed.push(plan_row),
            // The reader drops all-absent rows, so anything left
            // unparseable still carried data worth flagging.
            None if !row.is_empty() => {
                let campaign = row.text(mail_plan::CAMPAIGN_CODE);
                let chain = row.text(mail_plan::CHAIN);
                tracing::warn!(
                    campaign = campaign.as_deref().unwrap_or("-"),
                    chain = chain.as_deref().unwrap_or("-"),
                    "mail-plan row lacks a campaign code or chain title; skipping"
                );
                report
                    .warnings
                    .push(ImportWarning::IncompletePlanRow { campaign, chain });
            }
            None => {}
        }
    }
    if parsed.is_empty() {
        return Ok(report);
    }

    // Dedup pre-pass: one upsert per distinct key in the batch.
    let mut address_ids: HashMap<String, AddressId> = HashMap::new();
    let mut payee_ids: HashMap<String, PayeeNameId> = HashMap::new();
    let mut methods_by_country: HashMap<String, Vec<String>> = HashMap::new();

    for row in &parsed {
        for address in [&row.main_address, &row.chain_address]
            .into_iter()
            .flatten()
        {
            if !address_ids.contains_key(&address.text) {
                let stored = store
                    .upsert_address(tx, address.clone())
                    .await
                    .map_err(CampaignError::Store)?;
                address_ids.insert(address.text.clone(), stored.id);
            }
        }
        if let Some(payee) = &row.payee {
            let trimmed = payee.trim().to_string();
            if !trimmed.is_empty() && !payee_ids.contains_key(&trimmed) {
                let stored = store
                    .upsert_payee_name(tx, &trimmed)
                    .await
                    .map_err(CampaignError::Store)?;
                payee_ids.insert(trimmed, stored.id);
            }
        }
        if let (Some(country), false) = (&row.country, row.payment_methods.is_empty()) {
            methods_by_country
                .entry(country.clone())
                .or_insert_with(|| row.payment_methods.clone());
        }
    }

    for (country, methods) in methods_by_country {
        store
            .upsert_payment_method(
                tx,
                NewPaymentMethod {
                    country,
                    brand_id: None,
                    methods,
                },
            )
            .await
            .map_err(CampaignError::Store)?;
    }

    // Campaign rows, sequentially, against the upserted identifiers.
    for row in parsed {
        let chain = store
            .find_chain_by_title(tx, &row.chain_title)
            .await
            .map_err(CampaignError::Store)?
            .ok_or_else(|| CampaignError::ChainNotFound {
                chain: row.chain_title.clone(),
                campaign: row.code.clone(),
            })?;

        let chain_offers = store
            .chain_offers_ordered(tx, chain.id)
            .await
            .map_err(CampaignError::Store)?;

        tracing::debug!(
            campaign = %row.code,
            chain = %row.chain_title,
            offer = row.offer_title.as_deref().unwrap_or("-"),
            offers = chain_offers.len(),
            "linking mail-plan row"
        );

        let campaign = store
            .create_campaign(
                tx,
                NewCampaign {
                    code: row.code,
                    country: row.country.clone(),
                    chain_id: chain.id,
                    mail_quantity: row.mail_quantity,
                    mail_date: row.mail_date,
                    is_extracted: row.mail_quantity.is_some(),
                },
            )
            .await
            .map_err(CampaignError::Store)?;
        report.campaigns += 1;

        let main_id = row
            .main_address
            .as_ref()
            .and_then(|a| address_ids.get(&a.text).copied());
        // Follow-up offers fall back to the main address when the plan
        // gives no chain-level PO box.
        let followup_id = row
            .chain_address
            .as_ref()
            .and_then(|a| address_ids.get(&a.text).copied())
            .or(main_id);
        let payee_id = row
            .payee
            .as_ref()
            .and_then(|p| payee_ids.get(p.trim()).copied());
        let currency = symbol_for(row.country.as_deref()).to_string();

        let campaign_offers: Vec<NewCampaignOffer> = chain_offers
            .iter()
            .map(|chain_offer| NewCampaignOffer {
                campaign_id: campaign.id,
                offer_id: chain_offer.offer_id,
                payee_name_id: payee_id,
                return_address_id: if chain_offer.index == 1 {
                    main_id
                } else {
                    followup_id
                },
                printer: row.printer.clone(),
                currency: currency.clone(),
                fixed_cost: 0,
            })
            .collect();

        report.campaign_offers += campaign_offers.len();
        store
            .create_campaign_offers(tx, campaign_offers)
            .await
            .map_err(CampaignError::Store)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CellValue;

    fn plan_row(pairs: &[(&str, &str)]) -> Row {
        Row::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), CellValue::Text(v.to_string()))),
        )
    }

    #[test]
    fn row_without_campaign_code_is_blank() {
        assert!(MailPlanRow::parse(&plan_row(&[("Chain", "X")])).is_none());
        assert!(MailPlanRow::parse(&plan_row(&[("Campaign_code", "C1")])).is_none());
    }

    #[test]
    fn payment_methods_split_on_plus() {
        assert_eq!(split_payment_methods("Cash + Check"), ["cash", "check"]);
        assert_eq!(split_payment_methods(" Cash "), ["cash"]);
        assert!(split_payment_methods(" + ").is_empty());
    }

    #[test]
    fn addresses_parse_with_status() {
        let row = plan_row(&[
            ("Campaign_code", "C1"),
            ("Chain", "X"),
            ("PO Box for Main Mailing", " PO Box 7 "),
            ("Country of the Po Box", "France"),
            ("Warning_2", "closing soon"),
        ]);
        let parsed = MailPlanRow::parse(&row).unwrap();
        let main = parsed.main_address.unwrap();
        assert_eq!(main.text, "PO Box 7");
        assert_eq!(main.country.as_deref(), Some("france"));
        assert_eq!(main.status, AddressStatus::Closed);
        assert!(parsed.chain_address.is_none());
    }

    #[test]
    fn quantity_drives_is_extracted() {
        let mut row = plan_row(&[("Campaign_code", "C1"), ("Chain", "X")]);
        assert_eq!(MailPlanRow::parse(&row).unwrap().mail_quantity, None);

        row.insert("Extracted qty", CellValue::Number(1200.0));
        assert_eq!(MailPlanRow::parse(&row).unwrap().mail_quantity, Some(1200));
    }
}
