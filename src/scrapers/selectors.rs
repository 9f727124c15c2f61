//! CSS selectors for Zap Imóveis result pages.
//!
//! Update this file when the site changes its card markup.

use scraper::Selector;
use std::sync::LazyLock;

/// Card anchors on a result page; each anchor carries the detail URL
pub const CARD_LINK: &str = r#"li[data-cy="rp-property-cd"] a"#;

/// Pagination control
pub const NEXT_PAGE: &str = r#"[data-testid="next-page"]"#;

pub static CARD_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CARD_LINK).unwrap());

pub static PRICE_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-cy='rp-cardProperty-price-txt']").unwrap());

pub static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

pub static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());

pub static AREA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-cy='rp-cardProperty-propertyArea-txt']").unwrap());

pub static ROOMS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-cy='rp-cardProperty-bedroomQuantity-txt']").unwrap());

pub static BATHROOMS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-cy='rp-cardProperty-bathroomQuantity-txt']").unwrap()
});

pub static PARKING: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-cy='rp-cardProperty-parkingSpacesQuantity-txt']").unwrap()
});

pub static LOCATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-cy='rp-cardProperty-location-txt']").unwrap());
