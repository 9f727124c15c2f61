//! Crawl, dedupe and persist one category in a single call.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::db::{Db, DbError};
use crate::models::{Listing, PropertyCategory};
use crate::scrapers::{BrowserSession, Crawler, StopReason, Validator};

#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error("sample limit must be between 1 and {max}, got {requested}")]
    InvalidSampleLimit { requested: usize, max: usize },
    #[error("category '{0}' is not enabled")]
    CategoryDisabled(PropertyCategory),
    #[error("failed to start browser session: {0:#}")]
    Session(anyhow::Error),
    #[error("no data was collected by the crawler")]
    NoData,
    #[error("no unique data was collected after deduplication")]
    NoUniqueData,
    #[error("crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("failed to save listings: {0}")]
    Storage(#[from] DbError),
}

/// Collapse repeated ids, keeping the last record seen for each.
///
/// The surviving record takes the position where its id first appeared.
pub fn dedupe(records: impl IntoIterator<Item = Listing>) -> Vec<Listing> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Listing> = Vec::new();

    for record in records {
        match positions.get(&record.id) {
            Some(&at) => unique[at] = record,
            None => {
                positions.insert(record.id.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

/// Entry point used by the CLI (and any outer API) to run a collection
pub struct Collector {
    config: Config,
    cancel: Arc<AtomicBool>,
}

impl Collector {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting this flag stops the running crawl at its next page boundary
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn check_request(
        &self,
        category: PropertyCategory,
        sample_limit: usize,
    ) -> Result<(), CollectError> {
        let max = self.config.collect.max_sample_limit;
        if sample_limit == 0 || sample_limit > max {
            return Err(CollectError::InvalidSampleLimit {
                requested: sample_limit,
                max,
            });
        }
        if !self.config.collect.categories.contains(&category) {
            return Err(CollectError::CategoryDisabled(category));
        }
        Ok(())
    }

    /// Crawl `category`, dedupe the result and upsert it into `db`.
    ///
    /// The crawl blocks for minutes, so it runs on the blocking pool; the
    /// session is created there as well and never crosses threads.
    pub async fn collect_data<S, F>(
        &self,
        category: PropertyCategory,
        sample_limit: usize,
        open_session: F,
        db: &mut Db,
    ) -> Result<Vec<Listing>, CollectError>
    where
        S: BrowserSession + 'static,
        F: FnOnce() -> anyhow::Result<S> + Send + 'static,
    {
        self.check_request(category, sample_limit)?;
        info!(
            "Received request to collect {} samples of '{}'",
            sample_limit, category
        );

        let crawler = Crawler::new(
            self.config.crawl.clone(),
            Validator::new(self.config.validation.clone()),
        )
        .with_cancellation(self.cancel_flag());

        let report = tokio::task::spawn_blocking(move || {
            let session = open_session()?;
            Ok::<_, anyhow::Error>(crawler.crawl(session, category, sample_limit))
        })
        .await?
        .map_err(CollectError::Session)?;

        if let StopReason::SessionFault(reason) = &report.stop {
            warn!("Keeping partial results after session fault: {}", reason);
        }

        let collected = report.into_listings();
        if collected.is_empty() {
            return Err(CollectError::NoData);
        }

        info!(
            "Received {} listings from the crawler. Removing duplicates...",
            collected.len()
        );
        let unique = dedupe(collected);
        if unique.is_empty() {
            return Err(CollectError::NoUniqueData);
        }
        info!("{} unique listings to save", unique.len());

        db.upsert_listings(&unique)?;
        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn listing(id: &str, price: f64) -> Listing {
        Listing {
            id: id.to_string(),
            property_type: "casa".to_string(),
            price: Some(price),
            price_condominium: None,
            iptu: None,
            area_m2: 100,
            rooms: 3,
            bathrooms: 2,
            vacancies: 1,
            region: None,
            neighborhood: None,
            collection_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn last_occurrence_wins() {
        let out = dedupe(vec![listing("A", 1.0), listing("A", 2.0)]);
        assert_eq!(out, vec![listing("A", 2.0)]);
    }

    #[test]
    fn survivor_keeps_first_position() {
        let out = dedupe(vec![
            listing("A", 1.0),
            listing("B", 1.0),
            listing("A", 3.0),
            listing("C", 1.0),
        ]);
        let ids: Vec<_> = out.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(out[0].price, Some(3.0));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(dedupe(Vec::new()).is_empty());
    }

    #[test]
    fn request_bounds_are_checked() {
        let collector = Collector::new(Config::default());
        assert!(matches!(
            collector.check_request(PropertyCategory::Casa, 0),
            Err(CollectError::InvalidSampleLimit { .. })
        ));
        assert!(matches!(
            collector.check_request(PropertyCategory::Casa, 3001),
            Err(CollectError::InvalidSampleLimit { max: 3000, .. })
        ));
        assert!(collector.check_request(PropertyCategory::Casa, 3000).is_ok());
    }

    #[test]
    fn disabled_category_is_refused() {
        let mut config = Config::default();
        config.collect.categories = vec![PropertyCategory::Apartamento];
        let collector = Collector::new(config);
        assert!(matches!(
            collector.check_request(PropertyCategory::Sitio, 10),
            Err(CollectError::CategoryDisabled(PropertyCategory::Sitio))
        ));
    }
}
