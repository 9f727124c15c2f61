use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base URL of the sale listings catalog
pub const BASE_URL: &str = "https://www.zapimoveis.com.br/venda/";

/// Property category accepted by the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyCategory {
    Apartamento,
    Casa,
    Quitinete,
    Sobrado,
    Terreno,
    Sitio,
}

impl PropertyCategory {
    pub const ALL: [PropertyCategory; 6] = [
        Self::Apartamento,
        Self::Casa,
        Self::Quitinete,
        Self::Sobrado,
        Self::Terreno,
        Self::Sitio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartamento => "apartamento",
            Self::Casa => "casa",
            Self::Quitinete => "quitinete",
            Self::Sobrado => "sobrado",
            Self::Terreno => "terreno",
            Self::Sitio => "sitio",
        }
    }

    /// Result-page path relative to [`BASE_URL`], sorted by relevance
    pub fn listing_path(&self) -> &'static str {
        match self {
            Self::Apartamento => {
                "apartamentos/?transacao=venda&tipos=apartamento_residencial&ordem=MOST_RELEVANT"
            }
            Self::Casa => "casas/?transacao=venda&tipos=casa_residencial&ordem=MOST_RELEVANT",
            Self::Quitinete => {
                "quitinetes/?transacao=venda&tipos=kitnet_residencial&ordem=MOST_RELEVANT"
            }
            Self::Sobrado => {
                "sobrados/?transacao=venda&tipos=sobrado_residencial&ordem=MOST_RELEVANT"
            }
            Self::Terreno => {
                "terrenos-lotes-condominios/?transacao=venda&tipos=lote-terreno_residencial&ordem=MOST_RELEVANT"
            }
            Self::Sitio => {
                "fazendas-sitios-chacaras/?transacao=venda&tipos=granja_residencial&ordem=MOST_RELEVANT"
            }
        }
    }

    /// Full URL of the first result page under `base_url`
    pub fn listing_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.listing_path())
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown property category '{}'", s))
    }
}

/// A value pulled off a listing card before any coercion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(i64),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// One listing card sighting, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawListing {
    pub id: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<RawValue>,
    pub price_condominium: Option<RawValue>,
    pub iptu: Option<RawValue>,
    pub area_m2: Option<RawValue>,
    pub rooms: Option<RawValue>,
    pub bathrooms: Option<RawValue>,
    pub vacancies: Option<RawValue>,
    pub region: Option<String>,
    pub neighborhood: Option<String>,
}

/// Raw listing with numeric fields coerced to integers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedListing {
    pub id: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<i64>,
    pub price_condominium: Option<i64>,
    pub iptu: Option<i64>,
    pub area_m2: Option<i64>,
    pub rooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub vacancies: Option<i64>,
    pub region: Option<String>,
    pub neighborhood: Option<String>,
}

/// Validated listing, ready for persistence and JSON transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: String,
    pub property_type: String,
    pub price: Option<f64>,
    pub price_condominium: Option<f64>,
    pub iptu: Option<f64>,
    pub area_m2: i64,
    pub rooms: i64,
    pub bathrooms: i64,
    pub vacancies: i64,
    pub region: Option<String>,
    pub neighborhood: Option<String>,
    pub collection_date: NaiveDate,
}
