// src/parse.rs

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::extract::extract;
use crate::model::ProductRecord;
use crate::selectors;

/// Ways of locating listing cards on a results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStrategy {
    SearchResultsWidget,
    TileRoot,
}

/// Tried in order; the first one that finds anything is used alone.
pub const CARD_STRATEGIES: [CardStrategy; 2] =
    [CardStrategy::SearchResultsWidget, CardStrategy::TileRoot];

impl CardStrategy {
    fn selector(self) -> &'static Selector {
        match self {
            CardStrategy::SearchResultsWidget => &*selectors::SEARCH_RESULTS_WIDGET,
            CardStrategy::TileRoot => &*selectors::TILE_ROOT,
        }
    }
}

#[derive(Debug)]
pub struct CardMatch<'a> {
    /// `None` when no strategy matched the markup.
    pub strategy: Option<CardStrategy>,
    pub cards: Vec<ElementRef<'a>>,
}

/// Card nodes in document order, from the first strategy that finds any.
pub fn find_cards(document: &Html) -> CardMatch<'_> {
    for strategy in CARD_STRATEGIES {
        let cards: Vec<_> = document.select(strategy.selector()).collect();
        if !cards.is_empty() {
            debug!(?strategy, cards = cards.len(), "located listing cards");
            return CardMatch {
                strategy: Some(strategy),
                cards,
            };
        }
    }
    debug!("no card selector matched the page");
    CardMatch {
        strategy: None,
        cards: Vec::new(),
    }
}

/// What one page of markup yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOutcome {
    pub strategy: Option<CardStrategy>,
    pub cards_found: usize,
    pub records: Vec<ProductRecord>,
}

impl PageOutcome {
    pub fn rejected(&self) -> usize {
        self.cards_found - self.records.len()
    }
}

/// Parses a results page and keeps only the cards that extract cleanly.
pub fn parse_page(markup: &str, base: &Url) -> PageOutcome {
    let document = Html::parse_document(markup);
    let found = find_cards(&document);
    let records = found
        .cards
        .iter()
        .filter_map(|card| extract(*card, base))
        .collect();

    PageOutcome {
        strategy: found.strategy,
        cards_found: found.cards.len(),
        records,
    }
}
