//! Country normalization and currency lookup.
//!
//! The database stores `germany` while the sheets (and the admin UI)
//! may carry the `Germany/Deutschland` variant; every country read
//! from a sheet funnels through [`normalize_country`] before
//! persistence or lookup.

/// Normalize a sheet country value for storage: trimmed, lowercased,
/// with any `…deutschland…` variant collapsed to `germany`.
///
/// Returns `None` for blank input.
pub fn normalize_country(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if lower.contains("deutschland") {
        return Some("germany".to_string());
    }
    Some(lower)
}

/// Currency symbol for a normalized country name.
///
/// Unknown countries default to `"$"`; `germany` is special-cased to
/// the euro even when absent from the map.
pub fn symbol_for(country: Option<&str>) -> &'static str {
    let Some(country) = country else {
        return "$";
    };
    match country.trim().to_lowercase().as_str() {
        "france" | "belgium" | "austria" | "netherlands" | "spain" | "italy" | "ireland"
        | "portugal" | "finland" => "€",
        "uk" | "united kingdom" => "£",
        "switzerland" => "CHF",
        "canada" => "C$",
        "australia" => "A$",
        "japan" => "¥",
        "usa" | "united states" => "$",
        // Variant spelling reaches us already collapsed to this name.
        "germany" => "€",
        _ => "$",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deutschland_variants_collapse_to_germany() {
        assert_eq!(normalize_country("Germany/Deutschland").as_deref(), Some("germany"));
        assert_eq!(normalize_country(" DEUTSCHLAND ").as_deref(), Some("germany"));
        assert_eq!(normalize_country("France").as_deref(), Some("france"));
        assert_eq!(normalize_country("   "), None);
    }

    #[test]
    fn unknown_country_defaults_to_dollar() {
        assert_eq!(symbol_for(Some("atlantis")), "$");
        assert_eq!(symbol_for(None), "$");
    }

    #[test]
    fn germany_gets_euro() {
        assert_eq!(symbol_for(Some("germany")), "€");
        assert_eq!(symbol_for(normalize_country("Germany/Deutschland").as_deref()), "€");
    }

    #[test]
    fn mapped_countries_resolve() {
        assert_eq!(symbol_for(Some("france")), "€");
        assert_eq!(symbol_for(Some("uk")), "£");
        assert_eq!(symbol_for(Some("switzerland")), "CHF");
    }
}
