//! Field extraction from one rendered listing card.
//!
//! Every field is located on its own. A missing locator only blanks (or
//! defaults) that field; the rest of the card is still read.

use scraper::{ElementRef, Node, Selector};
use tracing::{debug, warn};

use crate::models::{RawListing, RawValue};
use crate::scrapers::selectors;

const ID_MARKER: &str = "-id-";
const FEE_SEPARATOR: char = '•';
const CONDOMINIUM_MARKER: &str = "Cond.";
const TAX_MARKER: &str = "IPTU";

/// Elements that start a new line of rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("malformed listing url '{url}': {reason}")]
    MalformedUrl { url: String, reason: &'static str },
}

/// A card field whose locator did not match
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("{field}: {reason}")]
pub struct FieldMiss {
    pub field: &'static str,
    pub reason: &'static str,
}

impl FieldMiss {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

/// Values read from the price container
#[derive(Debug, Default, PartialEq)]
pub struct PriceBlock {
    pub price: Option<String>,
    pub condominium: Option<String>,
    pub iptu: Option<String>,
}

/// Listing identifier: the segment after `-id-`, up to the next `/`
pub fn listing_id_from_url(url: &str) -> Result<String, ExtractError> {
    let malformed = |reason| ExtractError::MalformedUrl {
        url: url.to_string(),
        reason,
    };

    let (_, tail) = url
        .split_once(ID_MARKER)
        .ok_or_else(|| malformed("missing id marker"))?;
    let id = tail.split(['/', '?', '#']).next().unwrap_or_default().trim();

    if id.is_empty() {
        return Err(malformed("empty id segment"));
    }
    Ok(id.to_string())
}

/// Property type token: second `-`-separated piece of the detail URL
/// (`.../venda-apartamento-2-quartos-...` gives `apartamento`)
pub fn category_from_url(url: &str) -> Result<String, ExtractError> {
    match url.split('-').nth(1).map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(ExtractError::MalformedUrl {
            url: url.to_string(),
            reason: "missing property type token",
        }),
    }
}

/// Split the secondary price line into condominium fee and property tax.
///
/// A line with the tax marker and no condominium marker is all tax. A line
/// whose first `•` segment carries the condominium marker yields that segment
/// as the fee, and the second segment as tax when it carries the tax marker.
pub fn split_fee_line(line: &str) -> (Option<String>, Option<String>) {
    let mut condominium = None;
    let mut iptu = None;

    if line.contains(TAX_MARKER) && !line.contains(CONDOMINIUM_MARKER) {
        iptu = Some(line.trim().to_string());
    }

    let parts: Vec<&str> = line.split(FEE_SEPARATOR).collect();
    if parts[0].contains(CONDOMINIUM_MARKER) {
        condominium = Some(parts[0].trim().to_string());
        if let Some(second) = parts.get(1) {
            if second.contains(TAX_MARKER) {
                iptu = Some(second.trim().to_string());
            }
        }
    }

    (condominium, iptu)
}

/// `"1-2"` resolves to the upper bound `"2"`; plain values are trimmed
pub fn upper_bound_of_range(text: &str) -> String {
    match text.split('-').nth(1) {
        Some(upper) => upper.trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Location text to `(neighborhood, region)`, read from the last line
pub fn split_location(text: &str) -> Option<(String, String)> {
    let last_line = text.split('\n').last()?;
    let mut parts = last_line.split(',');
    let neighborhood = parts.next()?.trim().to_string();
    let region = parts.next()?.trim().to_string();
    Some((neighborhood, region))
}

/// Text of an element as a browser lays it out.
///
/// Inline children run together on one line and block elements start a new
/// one. Whitespace inside a line collapses to single spaces and blank lines
/// are dropped.
pub fn rendered_text(element: ElementRef<'_>) -> String {
    let mut flow = String::new();
    push_rendered(element, &mut flow);
    flow.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_rendered(element: ElementRef<'_>, flow: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                flow.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }))
            }
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_ELEMENTS.contains(&child.value().name());
                if block {
                    flow.push('\n');
                }
                push_rendered(child, flow);
                if block {
                    flow.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn price_block(card: ElementRef<'_>) -> Result<PriceBlock, FieldMiss> {
    let container = card
        .select(&selectors::PRICE_BLOCK)
        .next()
        .ok_or_else(|| FieldMiss::new("price", "price container not found"))?;

    let mut paragraphs = container.select(&selectors::PARAGRAPH);
    let price = paragraphs
        .next()
        .ok_or_else(|| FieldMiss::new("price", "price line not found"))?;

    let mut block = PriceBlock {
        price: Some(rendered_text(price)),
        ..PriceBlock::default()
    };

    match paragraphs.next() {
        Some(fees) => {
            let (condominium, iptu) = split_fee_line(&rendered_text(fees));
            block.condominium = condominium;
            block.iptu = iptu;
        }
        None => debug!("card has no condominium/IPTU line"),
    }

    Ok(block)
}

fn heading_text(
    card: ElementRef<'_>,
    selector: &Selector,
    field: &'static str,
) -> Result<String, FieldMiss> {
    card.select(selector)
        .next()
        .ok_or_else(|| FieldMiss::new(field, "container not found"))?
        .select(&selectors::HEADING)
        .next()
        .map(|h3| rendered_text(h3).trim().to_string())
        .ok_or_else(|| FieldMiss::new(field, "value heading not found"))
}

fn location(card: ElementRef<'_>) -> Result<(String, String), FieldMiss> {
    let element = card
        .select(&selectors::LOCATION)
        .next()
        .ok_or_else(|| FieldMiss::new("location", "container not found"))?;
    split_location(&rendered_text(element))
        .ok_or_else(|| FieldMiss::new("location", "expected 'neighborhood, region'"))
}

/// Keep a found field, log and drop a missed one
fn or_absent<T>(listing_id: &str, outcome: Result<T, FieldMiss>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(miss) => {
            warn!(listing_id, field = miss.field, "field not extracted: {}", miss.reason);
            None
        }
    }
}

/// Count fields fall back to `0` when their locator misses
fn or_zero(listing_id: &str, outcome: Result<String, FieldMiss>) -> Option<RawValue> {
    Some(
        or_absent(listing_id, outcome)
            .map(RawValue::Text)
            .unwrap_or(RawValue::Number(0)),
    )
}

/// Build a raw record from one card and its detail URL.
///
/// Only a malformed URL fails the whole card; field misses are contained.
pub fn extract_listing(card: ElementRef<'_>, href: &str) -> Result<RawListing, ExtractError> {
    let id = listing_id_from_url(href)?;
    let property_type = category_from_url(href)?;

    let prices = or_absent(&id, price_block(card)).unwrap_or_default();
    let bathrooms = heading_text(card, &selectors::BATHROOMS, "bathrooms")
        .map(|text| upper_bound_of_range(&text));
    let (neighborhood, region) = match or_absent(&id, location(card)) {
        Some((neighborhood, region)) => (Some(neighborhood), Some(region)),
        None => (None, None),
    };

    Ok(RawListing {
        property_type: Some(property_type),
        price: prices.price.map(RawValue::Text),
        price_condominium: prices.condominium.map(RawValue::Text),
        iptu: prices.iptu.map(RawValue::Text),
        area_m2: or_zero(&id, heading_text(card, &selectors::AREA, "area_m2")),
        rooms: or_zero(&id, heading_text(card, &selectors::ROOMS, "rooms")),
        bathrooms: or_zero(&id, bathrooms),
        vacancies: or_zero(&id, heading_text(card, &selectors::PARKING, "vacancies")),
        region,
        neighborhood,
        id: Some(id),
    })
}
