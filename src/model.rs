// src/model.rs

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One listing card that passed extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    pub current_price: u64,
    pub old_price: Option<u64>,
    pub rating: Option<f64>,
    /// Absent when the title came from the plain-text fallback.
    pub url: Option<String>,
}

impl ProductRecord {
    pub fn has_discount(&self) -> bool {
        self.old_price.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Every requested page was visited.
    PageLimit,
    /// The given page produced no valid records.
    EmptyPage(u32),
    Interrupted,
}

/// Everything gathered for one search term, in page order then card order.
/// Duplicates across pages are kept.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRun {
    pub run_id: Uuid,
    pub term: String,
    pub started_at: DateTime<Local>,
    pub records: Vec<ProductRecord>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

impl CollectionRun {
    pub fn new(run_id: Uuid, term: impl Into<String>) -> Self {
        Self {
            run_id,
            term: term.into(),
            started_at: Local::now(),
            records: Vec::new(),
            pages_fetched: 0,
            stop: StopReason::PageLimit,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn interrupted(&self) -> bool {
        self.stop == StopReason::Interrupted
    }

    pub fn discounted(&self) -> usize {
        self.records.iter().filter(|r| r.has_discount()).count()
    }
}
