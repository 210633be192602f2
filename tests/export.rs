use chrono::{Local, TimeZone};
use uuid::Uuid;

use ozon_tracker::analysis::Summary;
use ozon_tracker::export::{self, ExportFormat};
use ozon_tracker::{CollectionRun, ProductRecord, ScraperError};

fn sample_run() -> CollectionRun {
    let mut run = CollectionRun::new(Uuid::new_v4(), "наушники");
    run.records = vec![
        ProductRecord {
            title: "Наушники, беспроводные".to_string(),
            current_price: 2990,
            old_price: Some(4990),
            rating: Some(4.6),
            url: Some("https://www.ozon.ru/product/1/".to_string()),
        },
        ProductRecord {
            title: "Наушники проводные".to_string(),
            current_price: 590,
            old_price: None,
            rating: None,
            url: None,
        },
    ];
    run
}

#[test]
fn csv_export_has_bom_header_and_empty_cells() {
    let dir = tempfile::tempdir().unwrap();
    let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

    let files = export::save(&sample_run(), dir.path(), &[ExportFormat::Csv], at).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("ozon_products_20240501_123000.csv"));

    let bytes = std::fs::read(&files[0]).unwrap();
    assert!(bytes.starts_with("\u{feff}".as_bytes()));

    let text = String::from_utf8(bytes).unwrap();
    let mut lines = text.trim_start_matches('\u{feff}').lines();
    assert_eq!(
        lines.next().unwrap(),
        "title,current_price,old_price,rating,url,date_collected"
    );
    assert_eq!(
        lines.next().unwrap(),
        "\"Наушники, беспроводные\",2990,4990,4.6,https://www.ozon.ru/product/1/,2024-05-01 12:30:00"
    );
    assert_eq!(lines.next().unwrap(), "Наушники проводные,590,,,,2024-05-01 12:30:00");
}

#[test]
fn every_format_loads_back_the_same_rows() {
    let dir = tempfile::tempdir().unwrap();
    let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    let run = sample_run();

    let files = export::save(
        &run,
        dir.path(),
        &[ExportFormat::Csv, ExportFormat::Tsv, ExportFormat::Json],
        at,
    )
    .unwrap();
    assert_eq!(files.len(), 3);

    let expected = export::rows(&run, at);
    for file in &files {
        let rows = export::load(file).unwrap();
        assert_eq!(rows, expected, "mismatch in {}", file.display());
    }
}

#[test]
fn empty_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let run = CollectionRun::new(Uuid::new_v4(), "пусто");

    let files = export::save(&run, dir.path(), &[ExportFormat::Csv], Local::now()).unwrap();

    assert!(files.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn report_files_are_written_from_loaded_rows() {
    let dir = tempfile::tempdir().unwrap();
    let at = Local::now();
    let files = export::save(&sample_run(), dir.path(), &[ExportFormat::Csv], at).unwrap();

    let rows = export::load(&files[0]).unwrap();
    let summary = Summary::from_rows(&rows);
    let charts = dir.path().join("charts");
    let written = summary.write_report(&charts).unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(summary.with_old_price, 1);
    assert_eq!(summary.discounts[0].amount, 2000);
    let text = std::fs::read_to_string(&written[0]).unwrap();
    assert!(text.contains("Products: 2"));
}

#[test]
fn xlsx_export_is_a_zip_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

    let files = export::save(&sample_run(), dir.path(), &[ExportFormat::Xlsx], at).unwrap();

    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("ozon_products_20240501_123000.xlsx"));
    let bytes = std::fs::read(&files[0]).unwrap();
    assert!(bytes.len() > 100);
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn loading_an_xlsx_export_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let files = export::save(&sample_run(), dir.path(), &[ExportFormat::Xlsx], Local::now()).unwrap();

    let err = export::load(&files[0]).unwrap_err();

    assert!(matches!(err, ScraperError::WriteOnlyFormat(ref p) if p == &files[0]));
    assert!(err.to_string().contains("csv, tsv or json"));
}

#[test]
fn discounted_counts_records_that_show_an_old_price() {
    let mut run = sample_run();
    assert_eq!(run.discounted(), 1);

    run.records[1].old_price = Some(590);
    assert_eq!(run.discounted(), 2);
}
