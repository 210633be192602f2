// src/analysis.rs

//! Descriptive statistics over exported rows.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::export::ExportRow;

const TOP_N: usize = 10;
const TITLE_WIDTH: usize = 30;

/// count / mean / median / min / max / sample standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// `None` for fewer than two values.
    pub std: Option<f64>,
}

impl ColumnStats {
    /// `None` when there are no values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let median = if count % 2 == 0 {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        } else {
            values[count / 2]
        };
        let std = (count > 1).then(|| {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        });

        Some(Self {
            count,
            mean,
            median,
            min: values[0],
            max: values[count - 1],
            std,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
    pub title: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discount {
    pub title: String,
    pub current_price: u64,
    pub old_price: u64,
    pub amount: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub current_price: Option<ColumnStats>,
    pub old_price: Option<ColumnStats>,
    pub rating: Option<ColumnStats>,
    /// Rows that show an old price at all.
    pub with_old_price: usize,
    /// Rows whose old price is above the current one.
    pub discounts: Vec<Discount>,
    pub most_expensive: Vec<Ranked>,
    pub cheapest: Vec<Ranked>,
    pub best_rated: Vec<Ranked>,
    pub biggest_discounts: Vec<Ranked>,
    pub biggest_discount_percents: Vec<Ranked>,
}

impl Summary {
    pub fn from_rows(rows: &[ExportRow]) -> Self {
        let prices = || rows.iter().filter_map(|r| r.current_price.map(|p| (r, p as f64)));
        let ratings = || rows.iter().filter_map(|r| r.rating.map(|v| (r, v)));

        let discounts: Vec<Discount> = rows
            .iter()
            .filter_map(|r| match (r.current_price, r.old_price) {
                (Some(current), Some(old)) if old > current => Some(Discount {
                    title: r.title.clone(),
                    current_price: current,
                    old_price: old,
                    amount: old - current,
                    percent: (old - current) as f64 / old as f64 * 100.0,
                }),
                _ => None,
            })
            .collect();

        Self {
            total: rows.len(),
            current_price: ColumnStats::from_values(prices().map(|(_, p)| p)),
            old_price: ColumnStats::from_values(rows.iter().filter_map(|r| r.old_price.map(|p| p as f64))),
            rating: ColumnStats::from_values(ratings().map(|(_, v)| v)),
            with_old_price: rows.iter().filter(|r| r.old_price.is_some()).count(),
            most_expensive: top(prices().map(|(r, p)| (r.title.as_str(), p)), true),
            cheapest: top(prices().map(|(r, p)| (r.title.as_str(), p)), false),
            best_rated: top(ratings().map(|(r, v)| (r.title.as_str(), v)), true),
            biggest_discounts: top(
                discounts.iter().map(|d| (d.title.as_str(), d.amount as f64)),
                true,
            ),
            biggest_discount_percents: top(
                discounts.iter().map(|d| (d.title.as_str(), d.percent)),
                true,
            ),
            discounts,
        }
    }

    /// Share of rows with an old price, in percent.
    pub fn discount_share(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.with_old_price as f64 / self.total as f64 * 100.0
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "OZON SUMMARY REPORT");
        let _ = writeln!(out, "Products: {}", self.total);

        if let Some(s) = &self.current_price {
            let _ = writeln!(out, "\nPrices:");
            let _ = writeln!(out, "  mean:   {:.0} RUB", s.mean);
            let _ = writeln!(out, "  median: {:.0} RUB", s.median);
            let _ = writeln!(out, "  range:  {:.0} - {:.0} RUB", s.min, s.max);
            if let Some(std) = s.std {
                let _ = writeln!(out, "  std:    {std:.0} RUB");
            }
        }

        if let Some(s) = &self.rating {
            let _ = writeln!(out, "\nRatings:");
            let _ = writeln!(out, "  mean:   {:.2}", s.mean);
            let _ = writeln!(out, "  median: {:.2}", s.median);
        }

        if self.with_old_price > 0 {
            let _ = writeln!(out, "\nDiscounts:");
            let _ = writeln!(out, "  with old price: {}", self.with_old_price);
            let _ = writeln!(out, "  share:          {:.1}%", self.discount_share());
        }

        section(&mut out, "Most expensive", &self.most_expensive, 0);
        section(&mut out, "Cheapest", &self.cheapest, 0);
        section(&mut out, "Best rated", &self.best_rated, 2);
        section(&mut out, "Biggest discounts (RUB)", &self.biggest_discounts, 0);
        section(&mut out, "Biggest discounts (%)", &self.biggest_discount_percents, 1);
        out
    }

    /// Writes `summary_report.txt` and `summary.json` into `dir`.
    pub fn write_report(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let text_path = dir.join("summary_report.txt");
        fs::write(&text_path, self.render_text())?;

        let json_path = dir.join("summary.json");
        fs::write(&json_path, serde_json::to_string_pretty(self)?)?;

        info!(dir = %dir.display(), "summary report written");
        Ok(vec![text_path, json_path])
    }
}

fn section(out: &mut String, heading: &str, items: &[Ranked], precision: usize) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{heading}:");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "  {:>2}. {:<33} {:.*}", i + 1, item.title, precision, item.value);
    }
}

/// Top `TOP_N` by value, stable for ties.
fn top<'a>(items: impl Iterator<Item = (&'a str, f64)>, largest: bool) -> Vec<Ranked> {
    let mut items: Vec<_> = items.collect();
    items.sort_by(|a, b| {
        let ord = a.1.total_cmp(&b.1);
        if largest { ord.reverse() } else { ord }
    });
    items
        .into_iter()
        .take(TOP_N)
        .map(|(title, value)| Ranked {
            title: truncate_title(title),
            value,
        })
        .collect()
}

pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_WIDTH {
        let head: String = title.chars().take(TITLE_WIDTH).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, price: Option<u64>, old: Option<u64>, rating: Option<f64>) -> ExportRow {
        ExportRow {
            title: title.to_string(),
            current_price: price,
            old_price: old,
            rating,
            url: None,
            date_collected: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn stats_over_odd_and_even_counts() {
        let s = ColumnStats::from_values([3.0, 1.0, 2.0]).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.median, 2.0);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert_eq!(s.std, Some(1.0));

        let s = ColumnStats::from_values([4.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.median, 2.5);
    }

    #[test]
    fn single_value_has_no_std_and_empty_has_no_stats() {
        let s = ColumnStats::from_values([7.0]).unwrap();
        assert_eq!(s.std, None);
        assert!(ColumnStats::from_values(std::iter::empty()).is_none());
    }

    #[test]
    fn summary_counts_discounts_and_ranks() {
        let rows = [
            row("A", Some(100), Some(150), Some(4.5)),
            row("B", Some(300), None, Some(4.9)),
            row("C", Some(200), Some(180), None),
            row("D", None, None, Some(3.0)),
        ];
        let summary = Summary::from_rows(&rows);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.current_price.as_ref().unwrap().count, 3);
        assert_eq!(summary.with_old_price, 2);
        assert_eq!(summary.discount_share(), 50.0);

        assert_eq!(summary.discounts.len(), 1);
        assert_eq!(summary.discounts[0].amount, 50);
        assert!((summary.discounts[0].percent - 33.333).abs() < 0.01);

        let expensive: Vec<_> = summary.most_expensive.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(expensive, ["B", "C", "A"]);
        assert_eq!(summary.cheapest[0].title, "A");
        assert_eq!(summary.best_rated[0].title, "B");
    }

    #[test]
    fn empty_summary_renders() {
        let summary = Summary::from_rows(&[]);
        assert_eq!(summary.discount_share(), 0.0);
        assert!(summary.render_text().contains("Products: 0"));
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "Ноутбук игровой с очень длинным названием модели";
        let short = truncate_title(title);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 33);
        assert_eq!(truncate_title("short"), "short");
    }
}
