use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::models::{NormalizedListing, RawListing, RawValue};

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Coerce a raw card value to an integer.
///
/// Text is reduced to the concatenation of all its digit runs, so currency
/// symbols, separators and units disappear (`"R$ 950.000,00"` gives
/// `95000000`; cents are not split off). Text without digits, such as
/// "Sob consulta", gives `None`. Integers pass through unchanged.
pub fn normalize_value(raw: &RawValue) -> Option<i64> {
    match raw {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(text) => {
            let digits: String = DIGIT_RUN.find_iter(text).map(|m| m.as_str()).collect();
            if digits.is_empty() {
                return None;
            }
            match digits.parse::<i64>() {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(text = %text, "numeric value out of range: {}", e);
                    None
                }
            }
        }
    }
}

fn normalize_field(raw: Option<RawValue>) -> Option<i64> {
    raw.as_ref().and_then(normalize_value)
}

pub fn normalize_listing(raw: RawListing) -> NormalizedListing {
    NormalizedListing {
        id: raw.id,
        property_type: raw.property_type,
        price: normalize_field(raw.price),
        price_condominium: normalize_field(raw.price_condominium),
        iptu: normalize_field(raw.iptu),
        area_m2: normalize_field(raw.area_m2),
        rooms: normalize_field(raw.rooms),
        bathrooms: normalize_field(raw.bathrooms),
        vacancies: normalize_field(raw.vacancies),
        region: raw.region,
        neighborhood: raw.neighborhood,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> Option<i64> {
        normalize_value(&RawValue::from(text))
    }

    #[test]
    fn currency_digits_are_concatenated() {
        assert_eq!(norm("R$ 950.000,00"), Some(95_000_000));
        assert_eq!(norm("R$ 1.500.000"), Some(1_500_000));
        assert_eq!(norm("Cond. R$ 1.200"), Some(1200));
    }

    #[test]
    fn units_are_stripped() {
        assert_eq!(norm("120 m²"), Some(120));
        assert_eq!(norm("3"), Some(3));
    }

    #[test]
    fn text_without_digits_is_null() {
        assert_eq!(norm("Sob consulta"), None);
        assert_eq!(norm(""), None);
    }

    #[test]
    fn typed_values_pass_through() {
        assert_eq!(normalize_value(&RawValue::Number(0)), Some(0));
        assert_eq!(normalize_value(&RawValue::Number(95_000_000)), Some(95_000_000));
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = norm("R$ 950.000,00").unwrap();
        assert_eq!(normalize_value(&RawValue::Number(once)), Some(once));
        assert_eq!(norm(&once.to_string()), Some(once));
    }

    #[test]
    fn overflowing_digit_run_is_null() {
        assert_eq!(norm("99999999999999999999999"), None);
    }

    #[test]
    fn listing_fields_are_normalized_independently() {
        let raw = RawListing {
            id: Some("7".into()),
            price: Some("Sob consulta".into()),
            iptu: Some("IPTU R$ 310".into()),
            rooms: Some(RawValue::Number(0)),
            region: Some("São Paulo".into()),
            ..RawListing::default()
        };
        let normalized = normalize_listing(raw);
        assert_eq!(normalized.id.as_deref(), Some("7"));
        assert_eq!(normalized.price, None);
        assert_eq!(normalized.iptu, Some(310));
        assert_eq!(normalized.rooms, Some(0));
        assert_eq!(normalized.area_m2, None);
        assert_eq!(normalized.region.as_deref(), Some("São Paulo"));
    }
}
