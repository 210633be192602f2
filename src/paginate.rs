// src/paginate.rs

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::context::ScrapeContext;
use crate::fetch::PageFetcher;
use crate::model::{CollectionRun, StopReason};
use crate::parse::{PageOutcome, parse_page};

/// Walks the result pages of one search term, one page at a time.
pub struct Paginator<F> {
    fetcher: F,
    ctx: ScrapeContext,
}

impl<F: PageFetcher> Paginator<F> {
    pub fn new(fetcher: F, ctx: ScrapeContext) -> Self {
        Self { fetcher, ctx }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetches pages `1..=max_pages` in order and accumulates their records.
    ///
    /// Stops early at the first page with no valid records (a failed fetch
    /// counts as such a page) or when `cancel` fires. Records gathered before
    /// the stop are always returned.
    pub async fn collect(
        &self,
        term: &str,
        max_pages: u32,
        cancel: &CancellationToken,
    ) -> CollectionRun {
        let span = self.ctx.span().clone();
        self.collect_pages(term, max_pages, cancel)
            .instrument(span)
            .await
    }

    async fn collect_pages(
        &self,
        term: &str,
        max_pages: u32,
        cancel: &CancellationToken,
    ) -> CollectionRun {
        let mut run = CollectionRun::new(self.ctx.run_id(), term);
        info!(term, max_pages, "starting collection");

        for page in 1..=max_pages {
            if page > 1 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        run.stop = StopReason::Interrupted;
                        break;
                    }
                    _ = sleep(self.ctx.page_delay()) => {}
                }
            }
            if cancel.is_cancelled() {
                run.stop = StopReason::Interrupted;
                break;
            }

            let url = self.ctx.page_url(term, page);
            info!(page, max_pages, %url, "fetching page");

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    run.stop = StopReason::Interrupted;
                    break;
                }
                fetched = self.fetcher.fetch(&url) => fetched,
            };
            run.pages_fetched += 1;

            let outcome = match fetched {
                Ok(markup) => parse_page(&markup, self.ctx.base()),
                Err(e) => {
                    warn!(page, error = %e, "page fetch failed");
                    PageOutcome::default()
                }
            };

            if outcome.records.is_empty() {
                warn!(page, cards = outcome.cards_found, "no products on page, stopping");
                run.stop = StopReason::EmptyPage(page);
                break;
            }

            info!(
                page,
                collected = outcome.records.len(),
                rejected = outcome.rejected(),
                "page done"
            );
            run.records.extend(outcome.records);
        }

        info!(
            total = run.len(),
            pages = run.pages_fetched,
            stop = ?run.stop,
            "collection finished"
        );
        run
    }
}
