// src/selectors.rs

//! CSS selectors for Ozon search-result markup.
//!
//! When the site changes its class names, this is the only file to touch.

use std::sync::LazyLock;

use scraper::Selector;

fn compile(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("static selector {css:?} is invalid: {e}"))
}

/// Search-results widget container (primary card scheme).
pub static SEARCH_RESULTS_WIDGET: LazyLock<Selector> =
    LazyLock::new(|| compile(r#"div[data-widget="searchResultsV2"]"#));

/// Generic tile container (fallback card scheme).
pub static TILE_ROOT: LazyLock<Selector> = LazyLock::new(|| compile("div.tile-root"));

/// Title link; carries `title` and `href`.
pub static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| compile(r#"a[data-widget="searchResultV2"]"#));

/// Medium-weight body text used as a title when there is no title link.
pub static TITLE_TEXT: LazyLock<Selector> = LazyLock::new(|| compile("span.tsBody500Medium"));

/// Headline text holding the current price.
pub static PRICE: LazyLock<Selector> = LazyLock::new(|| compile("span.tsHeadline500Medium"));

/// Small control text. Old price and rating are both read from it.
pub static SMALL_CONTROL: LazyLock<Selector> =
    LazyLock::new(|| compile("span.tsBodyControl400Small"));
