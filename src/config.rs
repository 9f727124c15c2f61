//! Runtime configuration, loaded from an optional TOML file.
//!
//! Every field has a default so an empty (or missing) file yields a usable
//! configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::models::{PropertyCategory, BASE_URL};

/// Upper bound for any configured pacing delay
pub const MAX_DELAY_SECS: f64 = 3600.0;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub validation: ValidationConfig,
    pub collect: CollectConfig,
    pub browser: BrowserConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (name, range) in [
            ("crawl.initial_load_secs", self.crawl.initial_load_secs),
            ("crawl.scroll_settle_secs", self.crawl.scroll_settle_secs),
            ("crawl.page_delay_secs", self.crawl.page_delay_secs),
            ("crawl.long_pause_secs", self.crawl.long_pause_secs),
        ] {
            let in_bounds = |v: f64| v.is_finite() && (0.0..=MAX_DELAY_SECS).contains(&v);
            if !in_bounds(range.0) || !in_bounds(range.1) || range.1 < range.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a [min, max] pair within 0..={}s, got {:?}",
                    name, MAX_DELAY_SECS, range
                )));
            }
        }
        if self
            .crawl
            .long_pause_thresholds
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(ConfigError::Invalid(format!(
                "crawl.long_pause_thresholds must be strictly ascending, got {:?}",
                self.crawl.long_pause_thresholds
            )));
        }
        if self.collect.max_sample_limit == 0 {
            return Err(ConfigError::Invalid(
                "collect.max_sample_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Pacing and wait policy for the pagination walk
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub base_url: String,
    /// Bounded wait for listing cards to render
    pub card_wait_secs: u64,
    /// Bounded wait for the next-page control
    pub next_page_wait_secs: u64,
    pub initial_load_secs: (f64, f64),
    pub scroll_settle_secs: (f64, f64),
    pub page_delay_secs: (f64, f64),
    /// Cumulative link counts after which a long pause is taken
    pub long_pause_thresholds: Vec<usize>,
    pub long_pause_secs: (f64, f64),
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            card_wait_secs: 10,
            next_page_wait_secs: 10,
            initial_load_secs: (3.0, 3.0),
            scroll_settle_secs: (3.0, 5.0),
            page_delay_secs: (3.0, 6.0),
            long_pause_thresholds: vec![600, 1200, 1800],
            long_pause_secs: (10.0, 15.0),
        }
    }
}

impl CrawlConfig {
    pub fn card_wait(&self) -> Duration {
        Duration::from_secs(self.card_wait_secs)
    }

    pub fn next_page_wait(&self) -> Duration {
        Duration::from_secs(self.next_page_wait_secs)
    }

    /// A configuration with every delay set to zero, for tests and dry runs
    pub fn without_delays() -> Self {
        Self {
            card_wait_secs: 0,
            next_page_wait_secs: 0,
            initial_load_secs: (0.0, 0.0),
            scroll_settle_secs: (0.0, 0.0),
            page_delay_secs: (0.0, 0.0),
            long_pause_secs: (0.0, 0.0),
            ..Self::default()
        }
    }
}

/// Lower bounds enforced on canonical listings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_area_m2: i64,
    pub min_rooms: i64,
    pub min_bathrooms: i64,
    pub min_vacancies: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_area_m2: 1,
            min_rooms: 0,
            min_bathrooms: 1,
            min_vacancies: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    pub max_sample_limit: usize,
    pub categories: Vec<PropertyCategory>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_sample_limit: 3000,
            categories: PropertyCategory::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub user_agent: String,
    pub accept_language: String,
    pub platform: String,
    /// Chrome is shut down after this long without CDP traffic
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36".to_string(),
            accept_language: "pt-BR,pt".to_string(),
            platform: "Win32".to_string(),
            idle_timeout_secs: 120,
        }
    }
}
