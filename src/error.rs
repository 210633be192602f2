// src/error.rs

use thiserror::Error;

/// Run-level failures. Everything below the pagination loop recovers locally,
/// so these only come from setup and persistence.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Cannot read {}: xlsx exports are write-only, load the csv, tsv or json file instead", .0.display())]
    WriteOnlyFormat(std::path::PathBuf),
    #[error("Chart error: {0}")]
    Chart(String),
    #[error("Logging setup failed: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
    #[error("No data collected")]
    NoData,
}

pub type Result<T> = std::result::Result<T, ScraperError>;

/// A single page could not be retrieved. The paginator treats this as an
/// empty page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} failed with status: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Body { url, .. } => url,
        }
    }
}

/// Why a listing card was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("card has no title")]
    MissingTitle,
    #[error("card has no current price")]
    MissingPrice,
}
