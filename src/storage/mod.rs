//! Persistence layer.
//!
//! Saves and loads the collection value history to/from a flat CSV file
//! (`Date,Total Value`, one row per calendar day). The file is rewritten in
//! full on every save, sorted ascending by date.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::types::{CollectionSnapshot, HistoryLog, TrackerError};

/// Default history file path.
const DEFAULT_HISTORY_FILE: &str = "collection_history.csv";

const HEADER: &str = "Date,Total Value";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn resolve(path: Option<&Path>) -> &Path {
    path.unwrap_or_else(|| Path::new(DEFAULT_HISTORY_FILE))
}

/// Parse one `YYYY-MM-DD,<decimal>` row.
fn parse_row(row: &str) -> Result<CollectionSnapshot, TrackerError> {
    let parse_err = |message: String| TrackerError::Parse {
        context: format!("history row '{row}'"),
        message,
    };

    let (date, value) = row
        .split_once(',')
        .ok_or_else(|| parse_err("expected two columns".to_string()))?;

    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|e| parse_err(format!("bad date: {e}")))?;
    let total_value = value
        .trim()
        .trim_matches('"')
        .parse::<Decimal>()
        .map_err(|e| parse_err(format!("bad value: {e}")))?;

    Ok(CollectionSnapshot { date, total_value })
}

/// Parse history CSV text. The header row, blank rows and corrupt rows are
/// skipped; corrupt rows are logged.
pub fn parse_history(text: &str) -> HistoryLog {
    let mut rows = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (i == 0 && line.eq_ignore_ascii_case(HEADER)) {
            continue;
        }
        match parse_row(line) {
            Ok(snapshot) => rows.push(snapshot),
            Err(e) => warn!(line = i + 1, error = %e, "Skipping corrupt history row"),
        }
    }

    HistoryLog::from_entries(rows)
}

/// Render a history log as CSV, ascending by date, values to 2 places.
pub fn render_history(log: &HistoryLog) -> String {
    let mut sorted = log.clone();
    sorted.normalize();

    let mut out = String::from(HEADER);
    out.push('\n');
    for entry in sorted.entries() {
        out.push_str(&format!(
            "{},{:.2}\n",
            entry.date.format(DATE_FORMAT),
            entry.total_value.round_dp(2)
        ));
    }
    out
}

/// Save the history log to a CSV file.
pub fn save_history(log: &HistoryLog, path: Option<&Path>) -> Result<()> {
    let path = resolve(path);
    std::fs::write(path, render_history(log))
        .with_context(|| format!("Failed to write history to {}", path.display()))?;

    debug!(path = %path.display(), entries = log.len(), "History saved");
    Ok(())
}

/// Load the history log from a CSV file.
/// Returns an empty log if the file doesn't exist (first run).
pub fn load_history(path: Option<&Path>) -> Result<HistoryLog> {
    let path = resolve(path);

    if !path.exists() {
        info!(path = %path.display(), "No history file found, starting fresh");
        return Ok(HistoryLog::new());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;
    let log = parse_history(&text);

    info!(
        path = %path.display(),
        entries = log.len(),
        latest = ?log.latest().map(|e| e.date),
        "History loaded from disk"
    );

    Ok(log)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
