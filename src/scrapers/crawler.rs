//! Page-by-page walk over a category's result pages.
//!
//! One session, one linear walk. The crawler is the only component that
//! decides whether to keep going; every other stage reports per record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use scraper::Html;
use tracing::{debug, error, info, warn};

use crate::config::CrawlConfig;
use crate::models::{Listing, PropertyCategory};
use crate::scrapers::extract::extract_listing;
use crate::scrapers::selectors;
use crate::scrapers::session::{BrowserSession, SessionGuard};
use crate::scrapers::validate::Validator;

/// Why a walk ended
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    SampleLimitReached,
    /// No listing cards rendered within the wait
    NoMoreListings,
    /// No enabled next-page control within the wait
    EndOfPages,
    Cancelled,
    SessionFault(String),
}

/// Result of one crawl, including partial results after a fault
#[derive(Debug)]
pub struct CrawlReport {
    pub category: PropertyCategory,
    /// Validated listings, one batch per page in page order
    pub batches: Vec<Vec<Listing>>,
    pub links_collected: usize,
    pub pages_visited: usize,
    pub stop: StopReason,
}

impl CrawlReport {
    fn new(category: PropertyCategory) -> Self {
        Self {
            category,
            batches: Vec::new(),
            links_collected: 0,
            pages_visited: 0,
            stop: StopReason::NoMoreListings,
        }
    }

    pub fn listing_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Flatten the batches in encounter order
    pub fn into_listings(self) -> Vec<Listing> {
        self.batches.into_iter().flatten().collect()
    }
}

pub struct Crawler {
    config: CrawlConfig,
    validator: Validator,
    cancel: Option<Arc<AtomicBool>>,
}

impl Crawler {
    pub fn new(config: CrawlConfig, validator: Validator) -> Self {
        Self {
            config,
            validator,
            cancel: None,
        }
    }

    /// Stop at the next page boundary once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Walk the result pages of `category` until `sample_limit` links have
    /// been seen or the pages run out.
    ///
    /// The limit is checked once per page, so the last page read may push the
    /// count past it. The session is released on every path, and listings
    /// collected before a fault are kept.
    pub fn crawl<S: BrowserSession>(
        &self,
        session: S,
        category: PropertyCategory,
        sample_limit: usize,
    ) -> CrawlReport {
        info!("Starting crawl of '{}' (limit {})", category, sample_limit);

        let mut session = SessionGuard::new(session);
        let mut report = CrawlReport::new(category);

        report.stop = match self.walk(&mut *session, &mut report, sample_limit) {
            Ok(stop) => stop,
            Err(e) => {
                error!(
                    category = %category,
                    pages = report.pages_visited,
                    links = report.links_collected,
                    "Crawl aborted: {:#}",
                    e
                );
                StopReason::SessionFault(format!("{:#}", e))
            }
        };
        drop(session);

        info!(
            "Crawl finished ({:?}): {} pages, {} links, {} valid listings",
            report.stop,
            report.pages_visited,
            report.links_collected,
            report.listing_count()
        );
        report
    }

    fn walk<S: BrowserSession>(
        &self,
        session: &mut S,
        report: &mut CrawlReport,
        sample_limit: usize,
    ) -> Result<StopReason> {
        let url = report.category.listing_url(&self.config.base_url);
        session.open(&url)?;
        self.pause(self.config.initial_load_secs);

        let mut next_threshold = 0;
        let mut page = 1;

        loop {
            if self.is_cancelled() {
                info!("Crawl cancelled before page {}", page);
                return Ok(StopReason::Cancelled);
            }

            if !session.wait_for(selectors::CARD_LINK, self.config.card_wait())? {
                info!("No listings rendered on page {}", page);
                return Ok(StopReason::NoMoreListings);
            }

            if report.links_collected >= sample_limit {
                info!("Sample limit reached (limit={})", sample_limit);
                return Ok(StopReason::SampleLimitReached);
            }

            self.long_pause_if_due(report.links_collected, &mut next_threshold);

            info!("Collecting listings from page {}", page);
            let html = session
                .page_html()
                .with_context(|| format!("reading page {}", page))?;
            let (batch, links) = self.read_page(&html);
            report.links_collected += links;
            report.pages_visited = page;
            report.batches.push(batch);

            if !session.prepare_click(selectors::NEXT_PAGE, self.config.next_page_wait())? {
                info!("Next-page control not found. End of results.");
                return Ok(StopReason::EndOfPages);
            }
            self.pause(self.config.scroll_settle_secs);
            session
                .click(selectors::NEXT_PAGE)
                .with_context(|| format!("advancing past page {}", page))?;
            page += 1;
            self.pause(self.config.page_delay_secs);
        }
    }

    /// Extract and validate every card on a rendered page.
    ///
    /// Returns the valid listings and the number of card links seen.
    pub fn read_page(&self, html: &str) -> (Vec<Listing>, usize) {
        let document = Html::parse_document(html);
        let mut raw = Vec::new();
        let mut links = 0;

        for card in document.select(&selectors::CARD_LINK_SEL) {
            let Some(href) = card.value().attr("href") else {
                debug!("Card without link skipped");
                continue;
            };
            links += 1;

            match extract_listing(card, href) {
                Ok(record) => raw.push(record),
                Err(e) => warn!("Card dropped: {}", e),
            }
        }

        debug!("Page had {} card links, {} parsed", links, raw.len());
        (self.validator.validate_batch(raw), links)
    }

    fn long_pause_if_due(&self, links: usize, next_threshold: &mut usize) {
        if long_pause_due(&self.config.long_pause_thresholds, links, next_threshold) {
            info!("{} links collected, taking a long pause", links);
            self.pause(self.config.long_pause_secs);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn pause(&self, range: (f64, f64)) {
        match pause_duration(range) {
            Some(delay) if !delay.is_zero() => {
                debug!("Sleeping {:.1}s", delay.as_secs_f64());
                thread::sleep(delay);
            }
            Some(_) => {}
            None => warn!("Ignoring unusable delay range {:?}", range),
        }
    }
}

/// Whether the link count has crossed the next unpaused threshold.
///
/// Advances `next_threshold` past every threshold crossed, so one page that
/// jumps over several thresholds still yields a single pause. `thresholds`
/// must be ascending.
pub fn long_pause_due(thresholds: &[usize], links: usize, next_threshold: &mut usize) -> bool {
    let mut crossed = false;
    while *next_threshold < thresholds.len() && links >= thresholds[*next_threshold] {
        *next_threshold += 1;
        crossed = true;
    }
    crossed
}

/// Random delay within `[min, max]` seconds; `None` for a range that is not
/// a finite, non-negative, ordered pair
pub fn pause_duration((min, max): (f64, f64)) -> Option<Duration> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 || max < min {
        return None;
    }
    let secs = if max > min {
        rand::rng().random_range(min..=max)
    } else {
        min
    };
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a walk and returns the link counts at which a pause fired
    fn pauses(thresholds: &[usize], counts_per_page: &[usize]) -> Vec<usize> {
        let mut next = 0;
        counts_per_page
            .iter()
            .copied()
            .filter(|&links| long_pause_due(thresholds, links, &mut next))
            .collect()
    }

    #[test]
    fn one_pause_per_threshold_crossed() {
        let counts = [0, 300, 600, 900, 1200, 1500, 1800, 2100];
        assert_eq!(pauses(&[600, 1200, 1800], &counts), vec![600, 1200, 1800]);
    }

    #[test]
    fn crossing_without_exact_hit_still_pauses() {
        let counts = [0, 420, 630, 840, 1260];
        assert_eq!(pauses(&[600, 1200, 1800], &counts), vec![630, 1260]);
    }

    #[test]
    fn page_crossing_several_thresholds_pauses_once() {
        let mut next = 0;
        assert!(long_pause_due(&[600, 1200, 1800], 1900, &mut next));
        assert_eq!(next, 3);
        assert!(!long_pause_due(&[600, 1200, 1800], 2500, &mut next));
    }

    #[test]
    fn no_thresholds_never_pause() {
        assert!(pauses(&[], &[0, 600, 5000]).is_empty());
    }

    #[test]
    fn delay_within_range() {
        for _ in 0..50 {
            let delay = pause_duration((0.5, 1.5)).unwrap();
            assert!(delay >= Duration::from_millis(500) && delay <= Duration::from_millis(1500));
        }
        assert_eq!(pause_duration((2.0, 2.0)), Some(Duration::from_secs(2)));
        assert_eq!(pause_duration((0.0, 0.0)), Some(Duration::ZERO));
    }

    #[test]
    fn unusable_ranges_give_no_delay() {
        assert_eq!(pause_duration((1.0, f64::INFINITY)), None);
        assert_eq!(pause_duration((f64::NAN, f64::NAN)), None);
        assert_eq!(pause_duration((1e30, 1e30)), None);
        assert_eq!(pause_duration((-1.0, 1.0)), None);
        assert_eq!(pause_duration((3.0, 1.0)), None);
    }
}
