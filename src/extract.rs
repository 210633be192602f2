// src/extract.rs

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use tracing::debug;
use url::Url;

use crate::error::ExtractionError;
use crate::model::ProductRecord;
use crate::selectors;

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9\s]+").unwrap());
static DECIMAL_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+(?:,[0-9]+)?").unwrap());

/// Turns one listing card into a record, or `None` when the card lacks a
/// title or a current price.
pub fn extract(card: ElementRef<'_>, base: &Url) -> Option<ProductRecord> {
    match try_extract(card, base) {
        Ok(record) => Some(record),
        Err(reason) => {
            debug!(%reason, "skipping card");
            None
        }
    }
}

pub fn try_extract(card: ElementRef<'_>, base: &Url) -> Result<ProductRecord, ExtractionError> {
    // Every field is looked up independently; validity is decided at the end.
    let (title, url) = extract_title(card, base);
    let current_price = first_text(card, &selectors::PRICE).and_then(|t| parse_price(&t));
    let small = first_text(card, &selectors::SMALL_CONTROL);
    let old_price = small.as_deref().and_then(parse_price);
    let rating = small.as_deref().and_then(parse_rating);

    let title = title.filter(|t| !t.is_empty()).ok_or(ExtractionError::MissingTitle)?;
    let current_price = current_price.ok_or(ExtractionError::MissingPrice)?;

    Ok(ProductRecord {
        title,
        current_price,
        old_price,
        rating,
        url,
    })
}

/// Title link first, plain title text second. Only the link yields a URL.
fn extract_title(card: ElementRef<'_>, base: &Url) -> (Option<String>, Option<String>) {
    if let Some(link) = card.select(&selectors::TITLE_LINK).next() {
        let title = link.value().attr("title").unwrap_or_default().trim().to_string();
        let href = link.value().attr("href").unwrap_or_default();
        let url = base.join(href).ok().map(String::from);
        return (Some(title), url);
    }

    let title = first_text(card, &selectors::TITLE_TEXT);
    (title, None)
}

fn first_text(card: ElementRef<'_>, selector: &scraper::Selector) -> Option<String> {
    card.select(selector).next().map(stripped_text)
}

/// Descendant text nodes, each trimmed, empty ones dropped, joined together.
pub fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// `"12 990 ₽"` → `12990`. Takes the first run of digits and whitespace that
/// holds a digit and drops the whitespace.
pub fn parse_price(text: &str) -> Option<u64> {
    let run = DIGIT_RUN
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|s| s.chars().any(|c| c.is_ascii_digit()))?;
    let digits: String = run.chars().filter(|c| !c.is_whitespace()).collect();
    digits.parse().ok()
}

/// `"4,8"` → `4.8`.
pub fn parse_rating(text: &str) -> Option<f64> {
    let token = DECIMAL_COMMA.find(text)?.as_str();
    token.replace(',', ".").parse().ok()
}
