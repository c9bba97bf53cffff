//! Value-over-time chart, rendered as a standalone SVG.
//!
//! X is calendar time (gaps between runs show as gaps), Y is total value
//! scaled between the history's min and max.

use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::{self, Write as _};
use std::path::PathBuf;

use super::{amount, escape_html, write_artifact, CollectionReport, ReportSink};
use crate::types::HistoryLog;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

/// Pixel coordinates of every history entry, in date order.
fn plot_points(history: &HistoryLog) -> Vec<(f64, f64)> {
    let entries = history.entries();
    let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
        return Vec::new();
    };

    let values: Vec<f64> = entries
        .iter()
        .map(|e| e.total_value.to_f64().unwrap_or(0.0))
        .collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let span_days = (last.date - first.date).num_days() as f64;
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    entries
        .iter()
        .zip(values)
        .map(|(entry, value)| {
            let x = if span_days > 0.0 {
                MARGIN_LEFT + (entry.date - first.date).num_days() as f64 / span_days * plot_w
            } else {
                MARGIN_LEFT + plot_w / 2.0
            };
            let y = if max > min {
                MARGIN_TOP + (max - value) / (max - min) * plot_h
            } else {
                MARGIN_TOP + plot_h / 2.0
            };
            (x, y)
        })
        .collect()
}

/// Render the history as an SVG document.
pub fn render_svg(history: &HistoryLog) -> Result<String, fmt::Error> {
    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
    )?;
    writeln!(svg, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
    writeln!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="16">Collection Value Over Time</text>"#,
        WIDTH / 2.0
    )?;

    let entries = history.entries();
    let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
        writeln!(
            svg,
            r##"<text x="{}" y="{}" text-anchor="middle" fill="#888888">No history yet</text>"##,
            WIDTH / 2.0,
            HEIGHT / 2.0
        )?;
        svg.push_str("</svg>\n");
        return Ok(svg);
    };

    // Axes
    let bottom = HEIGHT - MARGIN_BOTTOM;
    let right = WIDTH - MARGIN_RIGHT;
    writeln!(
        svg,
        r##"<path d="M{MARGIN_LEFT} {MARGIN_TOP} V{bottom} H{right}" fill="none" stroke="#333333"/>"##
    )?;

    let min = entries.iter().map(|e| e.total_value).min().unwrap_or_default();
    let max = entries.iter().map(|e| e.total_value).max().unwrap_or_default();
    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end">${}</text>"#,
        MARGIN_LEFT - 8.0,
        MARGIN_TOP + 4.0,
        escape_html(&amount(max))
    )?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end">${}</text>"#,
        MARGIN_LEFT - 8.0,
        bottom + 4.0,
        escape_html(&amount(min))
    )?;
    writeln!(
        svg,
        r#"<text x="{MARGIN_LEFT}" y="{}" text-anchor="start">{}</text>"#,
        bottom + 20.0,
        first.date.format("%Y-%m-%d")
    )?;
    writeln!(
        svg,
        r#"<text x="{right}" y="{}" text-anchor="end">{}</text>"#,
        bottom + 20.0,
        last.date.format("%Y-%m-%d")
    )?;

    let points = plot_points(history);
    let polyline: Vec<String> = points.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
    writeln!(
        svg,
        r##"<polyline points="{}" fill="none" stroke="#1f77b4" stroke-width="2"/>"##,
        polyline.join(" ")
    )?;
    for ((x, y), entry) in points.iter().zip(entries) {
        writeln!(
            svg,
            r##"<circle cx="{x:.1}" cy="{y:.1}" r="3" fill="#1f77b4"><title>{}</title></circle>"##,
            escape_html(&entry.to_string())
        )?;
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Writes the value history chart.
pub struct ChartSink {
    path: PathBuf,
}

impl ChartSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for ChartSink {
    fn name(&self) -> &str {
        "chart"
    }

    fn render(&self, report: &CollectionReport<'_>) -> Result<()> {
        let svg = render_svg(report.history)?;
        write_artifact(self.name(), &self.path, &svg)
    }
}
