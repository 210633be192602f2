// src/charts.rs

//! PNG charts for a summary, drawn with plotters on the bitmap backend.
//!
//! Every file is a 2x2 grid of panels. Text uses a bundled DejaVu Sans, so no
//! system fonts are needed. A chart that fails to draw is logged and skipped.

use std::error::Error;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, TextStyle, register_font};
use tracing::{info, warn};

use crate::analysis::{ColumnStats, Ranked, Summary};
use crate::error::{Result, ScraperError};
use crate::export::ExportRow;

type DrawResult<T = ()> = std::result::Result<T, Box<dyn Error>>;
type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Painter = fn(&Area<'_>, &ChartData<'_>) -> DrawResult;

const SIZE: (u32, u32) = (1600, 1200);
const FONT: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

const SKY: RGBColor = RGBColor(135, 206, 235);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const GOLD: RGBColor = RGBColor(255, 215, 0);
const CORAL: RGBColor = RGBColor(240, 128, 128);
const MINT: RGBColor = RGBColor(144, 238, 144);

struct ChartData<'a> {
    summary: &'a Summary,
    prices: Vec<f64>,
    ratings: Vec<f64>,
    price_rating: Vec<(f64, f64)>,
}

/// Draws `price_distribution.png`, `rating_analysis.png` (when any row has a
/// rating), `discount_analysis.png` (when any row is discounted) and
/// `summary_report.png` into `dir`. Returns the files actually written.
pub fn render_all(rows: &[ExportRow], summary: &Summary, dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_font()?;
    fs::create_dir_all(dir)?;

    let data = ChartData {
        summary,
        prices: rows
            .iter()
            .filter_map(|r| r.current_price)
            .map(|p| p as f64)
            .collect(),
        ratings: rows.iter().filter_map(|r| r.rating).collect(),
        price_rating: rows
            .iter()
            .filter_map(|r| Some((r.current_price? as f64, r.rating?)))
            .collect(),
    };
    if data.prices.is_empty() {
        warn!("no prices to chart");
        return Ok(Vec::new());
    }

    let mut charts = vec![("price_distribution.png", price_distribution as Painter)];
    if !data.ratings.is_empty() {
        charts.push(("rating_analysis.png", rating_analysis as Painter));
    }
    if !summary.discounts.is_empty() {
        charts.push(("discount_analysis.png", discount_analysis as Painter));
    }
    charts.push(("summary_report.png", summary_report as Painter));

    let mut written = Vec::with_capacity(charts.len());
    for (name, paint) in charts {
        let path = dir.join(name);
        match draw_file(&path, paint, &data) {
            Ok(()) => {
                info!(path = %path.display(), "chart written");
                written.push(path);
            }
            Err(e) => warn!(chart = name, error = %e, "chart skipped"),
        }
    }
    Ok(written)
}

fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            register_font(FONT, FontStyle::Normal, FONT_BYTES)
                .map_err(|_| "bundled chart font could not be loaded".to_string())
        })
        .clone()
        .map_err(ScraperError::Chart)
}

fn draw_file(path: &Path, paint: Painter, data: &ChartData<'_>) -> DrawResult {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    paint(&root, data)?;
    root.present()?;
    Ok(())
}

fn price_distribution(root: &Area<'_>, data: &ChartData<'_>) -> DrawResult {
    let panels = root.split_evenly((2, 2));
    let markers = centre_markers(data.summary.current_price.as_ref());
    histogram(&panels[0], "Price distribution", "Price, RUB", &data.prices, 30, SKY, &markers)?;
    box_plot(&panels[1], "Price spread", "Price, RUB", &data.prices, SKY)?;
    ranked_bars(&panels[2], "Top 10 most expensive", "Price, RUB", &data.summary.most_expensive, CORAL, 0)?;
    ranked_bars(&panels[3], "Top 10 cheapest", "Price, RUB", &data.summary.cheapest, MINT, 0)?;
    Ok(())
}

fn rating_analysis(root: &Area<'_>, data: &ChartData<'_>) -> DrawResult {
    let panels = root.split_evenly((2, 2));
    let markers = centre_markers(data.summary.rating.as_ref());
    histogram(&panels[0], "Rating distribution", "Rating", &data.ratings, 20, GOLD, &markers)?;
    box_plot(&panels[1], "Rating spread", "Rating", &data.ratings, GOLD)?;
    scatter(&panels[2], "Price vs rating", ("Price, RUB", "Rating"), &data.price_rating, PURPLE)?;
    ranked_bars(&panels[3], "Top 10 best rated", "Rating", &data.summary.best_rated, GOLD, 2)?;
    Ok(())
}

fn discount_analysis(root: &Area<'_>, data: &ChartData<'_>) -> DrawResult {
    let discounts = &data.summary.discounts;
    let percents: Vec<f64> = discounts.iter().map(|d| d.percent).collect();
    let by_price: Vec<(f64, f64)> = discounts
        .iter()
        .map(|d| (d.current_price as f64, d.percent))
        .collect();

    let panels = root.split_evenly((2, 2));
    histogram(&panels[0], "Discount distribution", "Discount, %", &percents, 20, CORAL, &[])?;
    ranked_bars(&panels[1], "Top 10 discounts, RUB", "Discount, RUB", &data.summary.biggest_discounts, CORAL, 0)?;
    ranked_bars(&panels[2], "Top 10 discounts, %", "Discount, %", &data.summary.biggest_discount_percents, ORANGE, 1)?;
    scatter(&panels[3], "Price vs discount", ("Price, RUB", "Discount, %"), &by_price, PURPLE)?;
    Ok(())
}

fn summary_report(root: &Area<'_>, data: &ChartData<'_>) -> DrawResult {
    let summary = data.summary;
    let without = summary.total.saturating_sub(summary.with_old_price);

    let panels = root.split_evenly((2, 2));
    text_panel(&panels[0], "Summary", &summary_lines(summary))?;
    share_pie(
        &panels[1],
        "Old price shown",
        &[
            ("with old price", summary.with_old_price as f64, CORAL),
            ("without", without as f64, SKY),
        ],
    )?;
    histogram(&panels[2], "Prices", "Price, RUB", &data.prices, 20, SKY, &[])?;
    histogram(&panels[3], "Ratings", "Rating", &data.ratings, 20, GOLD, &[])?;
    Ok(())
}

fn summary_lines(summary: &Summary) -> Vec<String> {
    let mut lines = vec![format!("Products: {}", summary.total)];
    if let Some(s) = &summary.current_price {
        lines.push(format!("Mean price: {:.0} RUB", s.mean));
        lines.push(format!("Median price: {:.0} RUB", s.median));
        lines.push(format!("Price range: {:.0} - {:.0} RUB", s.min, s.max));
    }
    if let Some(s) = &summary.rating {
        lines.push(format!("Mean rating: {:.2}", s.mean));
        lines.push(format!("Rated products: {}", s.count));
    }
    lines.push(format!(
        "With old price: {} ({:.1}%)",
        summary.with_old_price,
        summary.discount_share()
    ));
    if let Some(top) = summary.biggest_discount_percents.first() {
        lines.push(format!("Biggest discount: {:.1}%", top.value));
    }
    lines
}

fn centre_markers(stats: Option<&ColumnStats>) -> Vec<(&'static str, f64, RGBColor)> {
    stats
        .map(|s| vec![("mean", s.mean, RED), ("median", s.median, GREEN)])
        .unwrap_or_default()
}

fn title_style(size: i32) -> TextStyle<'static> {
    (FONT, size).into_font().color(&BLACK)
}

fn no_data(area: &Area<'_>, caption: &str) -> DrawResult {
    let (w, h) = area.dim_in_pixel();
    let style = title_style(22).pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new(
        format!("{caption}: no data"),
        (w as i32 / 2, h as i32 / 2),
        style,
    ))?;
    Ok(())
}

fn histogram(
    area: &Area<'_>,
    caption: &str,
    x_desc: &str,
    values: &[f64],
    bins: usize,
    color: RGBColor,
    markers: &[(&str, f64, RGBColor)],
) -> DrawResult {
    if values.is_empty() {
        return no_data(area, caption);
    }
    let (lo, hi) = x_range(values);
    let counts = bucket(values, bins, lo, hi);
    let width = (hi - lo) / bins as f64;
    let y_top = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(lo..hi, 0.0..y_top)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Count")
        .draw()?;

    chart.draw_series(
        counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, &c)| {
                let x0 = lo + i as f64 * width;
                Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], color.mix(0.8).filled())
            }),
    )?;

    for &(label, x, marker) in markers {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, 0.0), (x, y_top)],
                marker.stroke_width(2),
            )))?
            .label(format!("{label}: {x:.1}"))
            .legend(move |(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], marker.stroke_width(2)));
    }
    if !markers.is_empty() {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font((FONT, 16).into_font())
            .draw()?;
    }
    Ok(())
}

/// Vertical box with Tukey whiskers (1.5 IQR) and outliers as rings.
fn box_plot(area: &Area<'_>, caption: &str, y_desc: &str, values: &[f64], color: RGBColor) -> DrawResult {
    let Some([min, q1, median, q3, max]) = five_numbers(values) else {
        return no_data(area, caption);
    };
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let inside = || values.iter().copied().filter(move |v| (lo_fence..=hi_fence).contains(v));
    let whisker_lo = inside().fold(median, f64::min);
    let whisker_hi = inside().fold(median, f64::max);
    let (y_lo, y_hi) = x_range(&[min, max]);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 24).into_font())
        .margin(15)
        .x_label_area_size(20)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..2.0, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(std::iter::once(Rectangle::new(
        [(0.6, q1), (1.4, q3)],
        color.mix(0.6).filled(),
    )))?;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(0.6, q1), (1.4, q3)],
        BLACK.stroke_width(2),
    )))?;

    let segments = [
        vec![(0.6, median), (1.4, median)],
        vec![(1.0, whisker_lo), (1.0, q1)],
        vec![(1.0, q3), (1.0, whisker_hi)],
        vec![(0.8, whisker_lo), (1.2, whisker_lo)],
        vec![(0.8, whisker_hi), (1.2, whisker_hi)],
    ];
    chart.draw_series(
        segments
            .into_iter()
            .enumerate()
            .map(|(i, points)| {
                let style = if i == 0 { RED.stroke_width(3) } else { BLACK.stroke_width(2) };
                PathElement::new(points, style)
            }),
    )?;

    chart.draw_series(
        values
            .iter()
            .copied()
            .filter(|v| !(lo_fence..=hi_fence).contains(v))
            .map(|v| Circle::new((1.0, v), 4, BLACK.stroke_width(1))),
    )?;
    Ok(())
}

/// Horizontal bars, first item on top, labelled with title and value.
fn ranked_bars(
    area: &Area<'_>,
    caption: &str,
    x_desc: &str,
    items: &[Ranked],
    color: RGBColor,
    precision: usize,
) -> DrawResult {
    if items.is_empty() {
        return no_data(area, caption);
    }
    let max = items.iter().map(|r| r.value).fold(0.0, f64::max).max(1.0);
    let n = items.len() as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(10)
        .build_cartesian_2d(0.0..max * 1.15, 0.0..n)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_label_formatter(&|_| String::new())
        .x_desc(x_desc)
        .draw()?;

    chart.draw_series(items.iter().enumerate().map(|(i, item)| {
        let y = n - i as f64;
        Rectangle::new([(0.0, y - 0.9), (item.value, y - 0.1)], color.mix(0.8).filled())
    }))?;

    let label = title_style(15).pos(Pos::new(HPos::Left, VPos::Center));
    chart.draw_series(items.iter().enumerate().map(|(i, item)| {
        Text::new(
            format!("{} ({:.*})", item.title, precision, item.value),
            (max * 0.01, n - i as f64 - 0.5),
            label.clone(),
        )
    }))?;
    Ok(())
}

fn scatter(
    area: &Area<'_>,
    caption: &str,
    (x_desc, y_desc): (&str, &str),
    points: &[(f64, f64)],
    color: RGBColor,
) -> DrawResult {
    if points.is_empty() {
        return no_data(area, caption);
    }
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let (x_lo, x_hi) = x_range(&xs);
    let (y_lo, y_hi) = x_range(&ys);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;
    chart.draw_series(
        points
            .iter()
            .map(|&p| Circle::new(p, 5, color.mix(0.6).filled())),
    )?;
    Ok(())
}

fn text_panel(area: &Area<'_>, caption: &str, lines: &[String]) -> DrawResult {
    area.draw(&Text::new(caption, (40, 30), title_style(28)))?;
    let body = title_style(22);
    for (i, line) in (0i32..).zip(lines) {
        area.draw(&Text::new(line.as_str(), (40, 90 + i * 36), body.clone()))?;
    }
    Ok(())
}

/// Pie drawn from polygons, one slice per non-zero part, starting at 12 o'clock.
fn share_pie(area: &Area<'_>, caption: &str, parts: &[(&str, f64, RGBColor)]) -> DrawResult {
    let total: f64 = parts.iter().map(|p| p.1).sum();
    if total <= 0.0 {
        return no_data(area, caption);
    }
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2 + 20);
    let radius = f64::from(w.min(h)) * 0.35;

    area.draw(&Text::new(
        caption,
        (w as i32 / 2, 20),
        title_style(24).pos(Pos::new(HPos::Center, VPos::Top)),
    ))?;

    let label = title_style(18).pos(Pos::new(HPos::Center, VPos::Center));
    let mut start = -FRAC_PI_2;
    for &(name, value, color) in parts {
        if value <= 0.0 {
            continue;
        }
        let sweep = value / total * TAU;
        let steps = (sweep.to_degrees().ceil() as usize).max(2);
        let mut points = vec![center];
        points.extend((0..=steps).map(|k| arc_point(center, radius, start + sweep * k as f64 / steps as f64)));
        area.draw(&Polygon::new(points, color.filled()))?;

        let text = format!("{name}: {:.1}%", value / total * 100.0);
        let at = arc_point(center, radius * 0.6, start + sweep / 2.0);
        area.draw(&Text::new(text, at, label.clone()))?;
        start += sweep;
    }
    Ok(())
}

fn arc_point(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 + (radius * angle.sin()).round() as i32,
    )
}

/// Equal-width bin counts over `lo..=hi`; the top edge falls in the last bin.
fn bucket(values: &[f64], bins: usize, lo: f64, hi: f64) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 || hi <= lo {
        return counts;
    }
    let width = (hi - lo) / bins as f64;
    for &v in values {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let i = (((v - lo) / width) as usize).min(bins - 1);
        counts[i] += 1;
    }
    counts
}

/// Axis range around the data with 5% padding. Never inverted or empty, and
/// never below zero for non-negative data.
fn x_range(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (0.0, 1.0);
    }
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else {
        (lo.abs() * 0.1).max(1.0)
    };
    let start = if lo >= 0.0 { (lo - pad).max(0.0) } else { lo - pad };
    (start, hi + pad)
}

/// min, lower quartile, median, upper quartile, max (linear interpolation).
fn five_numbers(values: &[f64]) -> Option<[f64; 5]> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let quantile = |p: f64| {
        let pos = p * (sorted.len() - 1) as f64;
        let i = pos.floor() as usize;
        let frac = pos - i as f64;
        match sorted.get(i + 1) {
            Some(next) => sorted[i] + (next - sorted[i]) * frac,
            None => sorted[i],
        }
    };
    Some([
        sorted[0],
        quantile(0.25),
        quantile(0.5),
        quantile(0.75),
        sorted[sorted.len() - 1],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_cover_both_edges() {
        let counts = bucket(&[0.0, 1.0, 5.0, 9.9, 10.0], 2, 0.0, 10.0);
        assert_eq!(counts, [2, 3]);
    }

    #[test]
    fn degenerate_bucket_range_counts_nothing() {
        assert_eq!(bucket(&[3.0, 3.0], 4, 3.0, 3.0), [0, 0, 0, 0]);
        assert!(bucket(&[1.0], 0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn ranges_are_padded_and_clamped_at_zero() {
        assert_eq!(x_range(&[]), (0.0, 1.0));
        assert_eq!(x_range(&[5.0, 5.0]), (4.0, 6.0));
        assert_eq!(x_range(&[0.0, 100.0]), (0.0, 105.0));
        assert_eq!(x_range(&[-10.0, 10.0]), (-11.0, 11.0));
    }

    #[test]
    fn five_numbers_interpolate_quartiles() {
        assert_eq!(five_numbers(&[5.0, 1.0, 3.0, 2.0, 4.0]), Some([1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(five_numbers(&[4.0, 1.0, 3.0, 2.0]), Some([1.0, 1.75, 2.5, 3.25, 4.0]));
        assert_eq!(five_numbers(&[7.0]), Some([7.0; 5]));
        assert_eq!(five_numbers(&[]), None);
    }

    #[test]
    fn arc_starts_at_twelve_o_clock() {
        assert_eq!(arc_point((100, 100), 50.0, -FRAC_PI_2), (100, 50));
        assert_eq!(arc_point((100, 100), 50.0, 0.0), (150, 100));
    }
}
