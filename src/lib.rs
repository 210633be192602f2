// src/lib.rs

pub mod analysis;
pub mod charts;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod paginate;
pub mod parse;
pub mod selectors;

use std::path::PathBuf;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use crate::analysis::Summary;
pub use crate::config::TrackerConfig;
pub use crate::context::ScrapeContext;
pub use crate::error::{ExtractionError, FetchError, Result, ScraperError};
pub use crate::export::ExportFormat;
pub use crate::fetch::{HttpFetcher, PageFetcher};
pub use crate::model::{CollectionRun, ProductRecord, StopReason};
pub use crate::paginate::Paginator;

/// What one `run_tracker` call produced.
#[derive(Debug)]
pub struct TrackerOutput {
    pub run: CollectionRun,
    pub data_files: Vec<PathBuf>,
    pub summary: Option<Summary>,
    pub report_files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TrackerRequest {
    pub term: String,
    pub max_pages: u32,
    pub analyze: bool,
}

/// Collects one search term, saves whatever was gathered and optionally
/// summarises it. An empty collection is `ScraperError::NoData`.
pub async fn run_tracker(
    config: &TrackerConfig,
    request: &TrackerRequest,
    cancel: &CancellationToken,
) -> Result<TrackerOutput> {
    let ctx = ScrapeContext::from_config(&config.scrape)?;
    let fetcher = HttpFetcher::new(&ctx)?;
    let paginator = Paginator::new(fetcher, ctx);

    let run = paginator
        .collect(&request.term, request.max_pages, cancel)
        .await;
    if run.interrupted() {
        warn!(collected = run.len(), "collection interrupted, keeping what was gathered");
    }
    if run.is_empty() {
        return Err(ScraperError::NoData);
    }

    let saved_at = Local::now();
    let data_files = export::save(&run, &config.output.dir, &config.output.formats, saved_at)?;

    let (summary, report_files) = if request.analyze {
        let rows = export::rows(&run, saved_at);
        let summary = Summary::from_rows(&rows);
        let mut files = summary.write_report(&config.output.charts_dir)?;
        files.extend(charts::render_all(&rows, &summary, &config.output.charts_dir)?);
        (Some(summary), files)
    } else {
        (None, Vec::new())
    };

    info!(
        records = run.len(),
        files = data_files.len(),
        "tracker run complete"
    );

    Ok(TrackerOutput {
        run,
        data_files,
        summary,
        report_files,
    })
}
