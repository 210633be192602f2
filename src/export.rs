// src/export.rs

//! Writes a collection run to tabular files and reads them back.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ScraperError};
use crate::model::{CollectionRun, ProductRecord};

const FILE_STEM: &str = "ozon_products";
const UTF8_BOM: &[u8] = "\u{feff}".as_bytes();
const SHEET_NAME: &str = "products";
const COLUMNS: [&str; 6] = [
    "title",
    "current_price",
    "old_price",
    "rating",
    "url",
    "date_collected",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Excel workbook with a single `products` sheet. Write-only.
    Xlsx,
    /// Comma separated, BOM-prefixed so spreadsheet apps pick up UTF-8.
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

/// One output row. Column order is the file column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub title: String,
    pub current_price: Option<u64>,
    pub old_price: Option<u64>,
    pub rating: Option<f64>,
    pub url: Option<String>,
    pub date_collected: String,
}

impl ExportRow {
    pub fn from_record(record: &ProductRecord, date_collected: &str) -> Self {
        Self {
            title: record.title.clone(),
            current_price: Some(record.current_price),
            old_price: record.old_price,
            rating: record.rating,
            url: record.url.clone(),
            date_collected: date_collected.to_string(),
        }
    }
}

pub fn rows(run: &CollectionRun, at: DateTime<Local>) -> Vec<ExportRow> {
    let stamp = at.format("%Y-%m-%d %H:%M:%S").to_string();
    run.records
        .iter()
        .map(|r| ExportRow::from_record(r, &stamp))
        .collect()
}

/// `ozon_products_<YYYYmmdd_HHMMSS>.<ext>` inside `dir`.
pub fn output_path(dir: &Path, format: ExportFormat, at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{FILE_STEM}_{}.{}",
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

/// Writes the run in every requested format. An empty run writes nothing.
pub fn save(
    run: &CollectionRun,
    dir: &Path,
    formats: &[ExportFormat],
    at: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    if run.is_empty() {
        warn!("no data to save");
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir)?;
    let rows = rows(run, at);
    let mut written = Vec::with_capacity(formats.len());

    for &format in formats {
        let path = output_path(dir, format, at);
        match format {
            ExportFormat::Xlsx => write_xlsx(&path, &rows)?,
            ExportFormat::Csv => write_delimited(&path, &rows, b',', true)?,
            ExportFormat::Tsv => write_delimited(&path, &rows, b'\t', false)?,
            ExportFormat::Json => write_json(&path, &rows)?,
        }
        info!(path = %path.display(), rows = rows.len(), "saved");
        written.push(path);
    }

    Ok(written)
}

fn write_delimited(path: &Path, rows: &[ExportRow], delimiter: u8, bom: bool) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    if bom {
        file.write_all(UTF8_BOM)?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_xlsx(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.set_freeze_panes(1, 0)?;
    sheet.set_column_width(0, 60.0)?;
    sheet.set_column_width(4, 50.0)?;
    sheet.set_column_width(5, 20.0)?;

    for (col, name) in (0u16..).zip(COLUMNS) {
        sheet.write_string_with_format(0, col, name, &bold)?;
    }

    for (row, r) in (1u32..).zip(rows) {
        sheet.write_string(row, 0, &r.title)?;
        if let Some(price) = r.current_price {
            sheet.write_number(row, 1, price as f64)?;
        }
        if let Some(old) = r.old_price {
            sheet.write_number(row, 2, old as f64)?;
        }
        if let Some(rating) = r.rating {
            sheet.write_number(row, 3, rating)?;
        }
        if let Some(url) = &r.url {
            sheet.write_string(row, 4, url)?;
        }
        sheet.write_string(row, 5, &r.date_collected)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_json(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, rows)?;
    file.flush()?;
    Ok(())
}

/// Reads a CSV or TSV export (by extension) or a JSON export. Workbooks are
/// rejected.
pub fn load(path: &Path) -> Result<Vec<ExportRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if ext.as_deref() == Some(ExportFormat::Xlsx.extension()) {
        return Err(ScraperError::WriteOnlyFormat(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let rows = match ext.as_deref() {
        Some("json") => serde_json::from_str(text)?,
        Some("tsv") => read_delimited(text, b'\t')?,
        _ => read_delimited(text, b',')?,
    };

    info!(path = %path.display(), rows = rows.len(), "loaded export");
    Ok(rows)
}

fn read_delimited(text: &str, delimiter: u8) -> Result<Vec<ExportRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let rows = rdr.deserialize().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_names_carry_the_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = output_path(Path::new("out"), ExportFormat::Tsv, at);
        assert_eq!(path, Path::new("out").join("ozon_products_20240309_140507.tsv"));
    }

    #[test]
    fn formats_deserialize_from_lowercase_names() {
        let formats: Vec<ExportFormat> =
            serde_json::from_str(r#"["xlsx","csv","tsv","json"]"#).unwrap();
        assert_eq!(
            formats,
            [
                ExportFormat::Xlsx,
                ExportFormat::Csv,
                ExportFormat::Tsv,
                ExportFormat::Json
            ]
        );
    }
}
