//! Report sinks.
//!
//! Each sink turns the run's valuation and history into one artifact on
//! disk. Sinks are independent: `render_all` tries every one and a failure
//! in one never stops the rest.

pub mod chart;
pub mod html;
pub mod spreadsheet;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info};

use crate::engine::valuation::Valuation;
use crate::types::{HistoryLog, TrackerError};

pub use chart::ChartSink;
pub use html::HtmlSink;
pub use spreadsheet::SpreadsheetSink;

/// Everything a sink may draw from.
#[derive(Debug, Clone, Copy)]
pub struct CollectionReport<'a> {
    /// Run date, stamped on every spreadsheet row.
    pub date: NaiveDate,
    pub valuation: &'a Valuation,
    pub history: &'a HistoryLog,
}

/// A report destination.
pub trait ReportSink {
    fn name(&self) -> &str;

    fn render(&self, report: &CollectionReport<'_>) -> Result<()>;
}

/// Per-sink result of a `render_all` pass.
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: String,
    pub error: Option<String>,
}

impl SinkOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Render every sink, logging each failure on its own.
pub fn render_all(sinks: &[Box<dyn ReportSink>], report: &CollectionReport<'_>) -> Vec<SinkOutcome> {
    sinks
        .iter()
        .map(|sink| {
            let error = match sink.render(report) {
                Ok(()) => None,
                Err(e) => {
                    error!(sink = sink.name(), error = %e, "Report failed");
                    Some(e.to_string())
                }
            };
            SinkOutcome { sink: sink.name().to_string(), error }
        })
        .collect()
}

/// Write a finished artifact, mapping I/O failures to `OutputWrite`.
pub(crate) fn write_artifact(artifact: &str, path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| {
        let message = match e.kind() {
            ErrorKind::PermissionDenied => {
                format!("{}: permission denied (is it open in another program?)", path.display())
            }
            _ => format!("{}: {e}", path.display()),
        };
        TrackerError::OutputWrite { artifact: artifact.to_string(), message }
    })?;

    info!(artifact, path = %path.display(), bytes = contents.len(), "Report written");
    Ok(())
}

/// Two-decimal rendering used by every artifact.
pub(crate) fn amount(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Escape text for HTML element content and attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
