// src/main.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ozon_tracker::{
    ScraperError, Summary, TrackerConfig, TrackerRequest, charts, export, logging, run_tracker,
};

#[derive(Parser, Debug)]
#[command(name = "ozon-tracker")]
#[command(about = "Collects Ozon search listings and summarises prices and ratings")]
struct Cli {
    /// TOML config file (defaults to ./ozon_tracker.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a category and save the results
    Collect {
        /// Search term, e.g. "ноутбуки"
        category: Option<String>,

        /// Number of result pages to walk
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        pages: Option<u32>,

        /// Directory for the exported files
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Skip the statistics report
        #[arg(long)]
        no_analysis: bool,
    },
    /// Summarise a previously exported CSV, TSV or JSON file and redraw its charts
    Analyze { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = TrackerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let _log_guard = logging::init(&config.logging, cli.verbose).context("initialising logging")?;

    let command = cli.command.unwrap_or(Command::Collect {
        category: None,
        pages: None,
        out_dir: None,
        no_analysis: false,
    });

    match command {
        Command::Collect {
            category,
            pages,
            out_dir,
            no_analysis,
        } => {
            if let Some(dir) = out_dir {
                config.output.dir = dir;
            }
            let request = TrackerRequest {
                term: category
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| config.scrape.default_category.clone()),
                max_pages: pages.unwrap_or(config.scrape.default_pages),
                analyze: !no_analysis,
            };
            collect(&config, &request).await
        }
        Command::Analyze { file } => analyze(&config, &file),
    }
}

async fn collect(config: &TrackerConfig, request: &TrackerRequest) -> Result<()> {
    println!("Collecting '{}' across {} page(s)...", request.term, request.max_pages);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current step");
            on_interrupt.cancel();
        }
    });

    let output = match run_tracker(config, request, &cancel).await {
        Ok(output) => output,
        Err(ScraperError::NoData) => {
            bail!("no data collected; the site markup may have changed");
        }
        Err(e) => {
            error!(error = %e, "tracker run failed");
            return Err(e.into());
        }
    };

    if output.run.interrupted() {
        println!("Interrupted, saved what was collected so far.");
    }
    println!(
        "Collected {} products from {} page(s)",
        output.run.len(),
        output.run.pages_fetched
    );
    let discounted = output.run.discounted();
    println!(
        "Discounted: {} ({:.1}%)",
        discounted,
        discounted as f64 / output.run.len() as f64 * 100.0
    );
    for path in &output.data_files {
        println!("  saved {}", path.display());
    }
    if let Some(summary) = &output.summary {
        println!("\n{}", summary.render_text());
        for path in &output.report_files {
            println!("  report {}", path.display());
        }
    }
    Ok(())
}

fn analyze(config: &TrackerConfig, file: &Path) -> Result<()> {
    let rows = export::load(file).with_context(|| format!("reading {}", file.display()))?;
    if rows.is_empty() {
        bail!("{} has no rows", file.display());
    }
    let summary = Summary::from_rows(&rows);
    println!("{}", summary.render_text());

    let dir = &config.output.charts_dir;
    let mut written = summary.write_report(dir)?;
    written.extend(charts::render_all(&rows, &summary, dir)?);
    for path in &written {
        println!("  report {}", path.display());
    }
    Ok(())
}
