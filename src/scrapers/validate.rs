use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::config::ValidationConfig;
use crate::models::{Listing, NormalizedListing, RawListing};
use crate::scrapers::normalize::normalize_listing;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    Missing(&'static str),
    #[error("field '{field}' is {value}, expected at least {min}")]
    BelowMinimum {
        field: &'static str,
        value: i64,
        min: i64,
    },
}

/// Typed contract applied to normalized listings
pub struct Validator {
    rules: ValidationConfig,
    collection_date: NaiveDate,
}

impl Validator {
    /// Validator stamping records with today's local date
    pub fn new(rules: ValidationConfig) -> Self {
        Self::with_date(rules, Local::now().date_naive())
    }

    pub fn with_date(rules: ValidationConfig, collection_date: NaiveDate) -> Self {
        Self {
            rules,
            collection_date,
        }
    }

    pub fn validate(&self, record: NormalizedListing) -> Result<Listing, ValidationError> {
        let id = non_empty(record.id, "id")?;
        let property_type = non_empty(record.property_type, "property_type")?;

        let area_m2 = at_least("area_m2", record.area_m2, self.rules.min_area_m2)?;
        let rooms = at_least("rooms", record.rooms, self.rules.min_rooms)?;
        let bathrooms = at_least("bathrooms", record.bathrooms, self.rules.min_bathrooms)?;
        let vacancies = at_least("vacancies", record.vacancies, self.rules.min_vacancies)?;

        Ok(Listing {
            id,
            property_type,
            price: money("price", record.price)?,
            price_condominium: money("price_condominium", record.price_condominium)?,
            iptu: money("iptu", record.iptu)?,
            area_m2,
            rooms,
            bathrooms,
            vacancies,
            region: record.region.filter(|s| !s.is_empty()),
            neighborhood: record.neighborhood.filter(|s| !s.is_empty()),
            collection_date: self.collection_date,
        })
    }

    /// Normalize and validate one page worth of raw records.
    ///
    /// Rejections are logged one by one and left out of the result.
    pub fn validate_batch(&self, records: Vec<RawListing>) -> Vec<Listing> {
        let total = records.len();
        let mut valid = Vec::with_capacity(total);

        for raw in records {
            let normalized = normalize_listing(raw);
            match self.validate(normalized.clone()) {
                Ok(listing) => valid.push(listing),
                Err(e) => warn!(record = ?normalized, "listing failed validation: {}", e),
            }
        }

        debug!("{} of {} listings passed validation", valid.len(), total);
        valid
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::Missing(field))
}

fn at_least(field: &'static str, value: Option<i64>, min: i64) -> Result<i64, ValidationError> {
    let value = value.ok_or(ValidationError::Missing(field))?;
    if value < min {
        return Err(ValidationError::BelowMinimum { field, value, min });
    }
    Ok(value)
}

fn money(field: &'static str, value: Option<i64>) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(v) if v < 0 => Err(ValidationError::BelowMinimum {
            field,
            value: v,
            min: 0,
        }),
        Some(v) => Ok(Some(v as f64)),
        None => Ok(None),
    }
}
