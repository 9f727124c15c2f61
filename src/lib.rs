//! Listing collector for the Zap Imóveis sale catalog.
//!
//! A headless browser walks a category's result pages; each card is
//! extracted, normalized and validated, the batch is deduplicated on the
//! listing id and upserted into SQLite.

pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod scrapers;

pub use config::Config;
pub use db::{Db, DbError};
pub use models::{Listing, PropertyCategory, RawListing, RawValue};
pub use pipeline::{dedupe, CollectError, Collector};
