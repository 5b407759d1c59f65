//! Fixed column vocabulary of the two source sheets.
//!
//! The vocabulary is case-sensitive and hand-specified; there is no
//! schema inference. Header validation runs against the detected
//! header row before any row is processed, so a missing or renamed
//! column fails the import up front instead of producing offers with
//! empty fields.

use thiserror::Error;

/// Error raised when a sheet's header row does not match the
/// vocabulary.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// A required column is absent from the detected headers.
    #[error("sheet {sheet:?} is missing required column {column:?}")]
    MissingColumn {
        /// Sheet whose header row was validated.
        sheet: String,
        /// The absent column name.
        column: String,
    },
}

/// Check that every required column appears among the detected
/// headers.
pub fn validate_headers(
    sheet: &str,
    headers: &[String],
    required: &[String],
) -> Result<(), SchemaError> {
    for column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(SchemaError::MissingColumn {
                sheet: sheet.to_string(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}

/// Marketing sheet: one row per chain fragment, up to five offer
/// slots per row.
pub mod marketing {
    /// Default sheet name.
    pub const SHEET: &str = "marketing";

    /// Mail carrier column.
    pub const PORTER: &str = "Porteur";
    /// Business owner column.
    pub const OWNER: &str = "Owner";
    /// Marketing theme column.
    pub const THEME: &str = "Theme";
    /// Grade column.
    pub const GRADE: &str = "Grade";
    /// Country column.
    pub const COUNTRY: &str = "Country";
    /// Language column.
    pub const LANGUAGE: &str = "Language";
    /// Language code column.
    pub const LANGUAGE_CODE: &str = "Language_code";
    /// Template version column.
    pub const VERSION: &str = "Version";
    /// Origin column.
    pub const ORIGIN: &str = "Origin";
    /// Chain title column.
    pub const CHAIN: &str = "Chain";

    /// How many offer slots one row can carry.
    pub const OFFER_SLOTS: usize = 5;

    /// Offer code column for slot `n` (1-based).
    pub fn code_offer(n: usize) -> String {
        format!("Code Offer {n}")
    }

    /// Offer description column for slot `n` (1-based); becomes the
    /// offer's type.
    pub fn description_offer(n: usize) -> String {
        format!("Description Offer {n}")
    }

    /// Dependency column for slot `n` (1-based); holds the title of
    /// the offer the transition originates from.
    pub fn dependency_offer(n: usize) -> String {
        format!("Dependency Offer {n}")
    }

    /// Day-offset column for slot `n` (1-based).
    pub fn date_of_generation(n: usize) -> String {
        format!("Date of generation {n}")
    }

    /// Every column the extractor reads, in sheet order.
    pub fn required_columns() -> Vec<String> {
        let mut columns: Vec<String> = [
            PORTER,
            OWNER,
            THEME,
            GRADE,
            COUNTRY,
            LANGUAGE,
            LANGUAGE_CODE,
            VERSION,
            ORIGIN,
            CHAIN,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for n in 1..=OFFER_SLOTS {
            columns.push(code_offer(n));
            columns.push(description_offer(n));
            columns.push(dependency_offer(n));
            columns.push(date_of_generation(n));
        }
        columns
    }
}

/// Mail-plan sheet: one row per concrete mailing of one chain.
pub mod mail_plan {
    /// Default sheet name.
    pub const SHEET: &str = "MAIL PLAN";

    /// Planned mail date (Excel serial number).
    pub const MAIL_DATE: &str = "Mail date";
    /// Campaign country.
    pub const COUNTRY: &str = "Country";
    /// Campaign code.
    pub const CAMPAIGN_CODE: &str = "Campaign_code";
    /// Title of the chain being mailed.
    pub const CHAIN: &str = "Chain";
    /// Title of the offer being mailed in this campaign.
    pub const OFFER: &str = "Offer";
    /// Printer name.
    pub const PRINTER: &str = "Printer";
    /// Extracted mail quantity.
    pub const EXTRACTED_QTY: &str = "Extracted qty";
    /// "+"-delimited payment methods for the country.
    pub const PAYMENT_METHOD: &str = "Payment method";
    /// Payee name for checks.
    pub const PAYEE_NAME: &str = "Payee name (check only)";
    /// Main mailing PO box.
    pub const PO_BOX_MAIN: &str = "PO Box for Main Mailing";
    /// Country of the main PO box.
    pub const PO_BOX_MAIN_COUNTRY: &str = "Country of the Po Box";
    /// First warning for the main PO box.
    pub const WARNING_1: &str = "Warning_1";
    /// Second warning for the main PO box; drives address status.
    pub const WARNING_2: &str = "Warning_2";
    /// Chain-level PO box.
    pub const PO_BOX_CHAIN: &str = "PO Box for the Chain";
    /// Country of the chain-level PO box.
    pub const PO_BOX_CHAIN_COUNTRY: &str = "Country of the Po Box2";
    /// First warning for the chain-level PO box.
    pub const WARNING_1_CHAIN: &str = "Warning12";
    /// Second warning for the chain-level PO box.
    pub const WARNING_2_CHAIN: &str = "Warning23";

    /// Every column the linking pass reads, in sheet order.
    pub fn required_columns() -> Vec<String> {
        [
            MAIL_DATE,
            COUNTRY,
            CAMPAIGN_CODE,
            CHAIN,
            OFFER,
            PRINTER,
            EXTRACTED_QTY,
            PAYMENT_METHOD,
            PAYEE_NAME,
            PO_BOX_MAIN,
            PO_BOX_MAIN_COUNTRY,
            WARNING_1,
            WARNING_2,
            PO_BOX_CHAIN,
            PO_BOX_CHAIN_COUNTRY,
            WARNING_1_CHAIN,
            WARNING_2_CHAIN,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_marketing_header_validates() {
        let headers = marketing::required_columns();
        assert!(validate_headers(marketing::SHEET, &headers, &headers).is_ok());
    }

    #[test]
    fn missing_chain_column_fails_fast() {
        let headers: Vec<String> = marketing::required_columns()
            .into_iter()
            .filter(|c| c != marketing::CHAIN)
            .collect();
        let err = validate_headers(marketing::SHEET, &headers, &marketing::required_columns())
            .unwrap_err();
        let SchemaError::MissingColumn { column, .. } = err;
        assert_eq!(column, marketing::CHAIN);
    }

    #[test]
    fn slot_columns_are_numbered_from_one() {
        assert_eq!(marketing::code_offer(1), "Code Offer 1");
        assert_eq!(marketing::date_of_generation(5), "Date of generation 5");
    }
}
