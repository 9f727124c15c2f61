pub mod browser;
pub mod crawler;
pub mod extract;
pub mod normalize;
pub mod selectors;
pub mod session;
pub mod validate;

pub use browser::ChromeSession;
pub use crawler::{CrawlReport, Crawler, StopReason};
pub use extract::{extract_listing, ExtractError};
pub use normalize::{normalize_listing, normalize_value};
pub use session::{BrowserSession, SessionGuard};
pub use validate::{ValidationError, Validator};
