//! Spreadsheet report: one CSV row per valuation line plus a TOTAL row.

use anyhow::Result;
use std::path::PathBuf;

use super::{amount, write_artifact, CollectionReport, ReportSink};
use crate::engine::valuation::ValuationLine;

const HEADER: [&str; 9] = [
    "Date",
    "Game",
    "Card Name",
    "Set",
    "Quantity",
    "Unit Price",
    "Total",
    "Cost Basis",
    "Profit/Loss",
];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn push_row(out: &mut String, row: &[String]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

fn line_row(date: &str, line: &ValuationLine) -> Vec<String> {
    vec![
        date.to_string(),
        line.card.game.to_string(),
        line.card.name.clone(),
        line.card.set_name.clone(),
        line.quantity.to_string(),
        line.card.unit_price.to_string(),
        line.line_total.to_string(),
        line.cost_basis.map(amount).unwrap_or_default(),
        line.profit_loss.map(amount).unwrap_or_default(),
    ]
}

/// Render the full spreadsheet text.
pub fn render_csv(report: &CollectionReport<'_>) -> String {
    let date = report.date.format("%Y-%m-%d").to_string();
    let valuation = report.valuation;

    let mut out = String::new();
    push_row(&mut out, &HEADER.map(String::from));
    for line in &valuation.lines {
        push_row(&mut out, &line_row(&date, line));
    }

    let profit_loss = if valuation.has_profit_loss() {
        amount(valuation.total_profit_loss)
    } else {
        String::new()
    };
    push_row(
        &mut out,
        &[
            date,
            String::new(),
            "TOTAL".to_string(),
            String::new(),
            valuation.card_count().to_string(),
            String::new(),
            amount(valuation.total_value),
            String::new(),
            profit_loss,
        ],
    );
    out
}

/// Writes the priced collection as a CSV spreadsheet.
pub struct SpreadsheetSink {
    path: PathBuf,
}

impl SpreadsheetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for SpreadsheetSink {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    fn render(&self, report: &CollectionReport<'_>) -> Result<()> {
        write_artifact(self.name(), &self.path, &render_csv(report))
    }
}
