//! HTML collection page: one linked tile per card, totals in the header.

use anyhow::Result;
use rust_decimal::Decimal;
use std::path::PathBuf;

use super::{amount, escape_html, write_artifact, CollectionReport, ReportSink};
use crate::engine::valuation::ValuationLine;

/// Page skeleton, compiled into the binary.
const PAGE_TEMPLATE: &str = include_str!("templates/collection.html");

fn signed_money(value: Decimal) -> String {
    if value.is_sign_negative() && !value.is_zero() {
        format!("-${}", amount(value.abs()))
    } else {
        format!("+${}", amount(value))
    }
}

fn pl_class(value: Decimal) -> &'static str {
    if value.is_sign_negative() && !value.is_zero() {
        "negative"
    } else {
        "positive"
    }
}

fn money_or_na(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("${}", amount(v)),
        None => "N/A".to_string(),
    }
}

fn render_tile(line: &ValuationLine) -> String {
    let card = &line.card;
    let name = escape_html(&card.name);

    let image = match &card.image_url {
        Some(url) => format!(
            r#"<img src="{}" alt="{name}" loading="lazy">"#,
            escape_html(url)
        ),
        None => r#"<div class="noimg">No image</div>"#.to_string(),
    };

    let profit_loss = line
        .profit_loss
        .map(|pl| {
            format!(
                r#"<div class="pl {}">P/L {}</div>"#,
                pl_class(pl),
                signed_money(pl)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<a class="tile" href="{href}" target="_blank" rel="noopener">
  {image}
  <span class="qty">x{qty}</span>
  <div class="name">{name}</div>
  <div class="set">{set} &middot; {game}</div>
  <div class="prices"><span>{unit} ea</span><span>{total}</span></div>
  {profit_loss}
</a>"#,
        href = escape_html(&card.detail_uri),
        qty = line.quantity,
        set = escape_html(&card.set_name),
        game = escape_html(&card.game.to_string()),
        unit = money_or_na(card.unit_price.amount()),
        total = money_or_na(line.line_total.amount()),
    )
}

/// Render the full HTML page.
pub fn render_page(report: &CollectionReport<'_>) -> String {
    let valuation = report.valuation;

    let game_totals: Vec<String> = valuation
        .game_totals
        .iter()
        .map(|(game, total)| {
            format!(
                "    <span>{}: <b>${}</b></span>",
                escape_html(&game.to_string()),
                amount(*total)
            )
        })
        .collect();

    let tiles: Vec<String> = valuation.lines.iter().map(render_tile).collect();

    let (profit_loss, class) = if valuation.has_profit_loss() {
        (
            signed_money(valuation.total_profit_loss),
            pl_class(valuation.total_profit_loss),
        )
    } else {
        ("N/A".to_string(), "")
    };

    // Tiles go in last so card text can never be read as a placeholder
    PAGE_TEMPLATE
        .replace("{{date}}", &report.date.format("%Y-%m-%d").to_string())
        .replace("{{total}}", &format!("${}", amount(valuation.total_value)))
        .replace("{{pl_class}}", class)
        .replace("{{profit_loss}}", &profit_loss)
        .replace("{{card_count}}", &valuation.card_count().to_string())
        .replace("{{game_totals}}", &game_totals.join("\n"))
        .replace("{{tiles}}", &tiles.join("\n"))
}

/// Writes the browsable collection page.
pub struct HtmlSink {
    path: PathBuf,
}

impl HtmlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for HtmlSink {
    fn name(&self) -> &str {
        "html"
    }

    fn render(&self, report: &CollectionReport<'_>) -> Result<()> {
        write_artifact(self.name(), &self.path, &render_page(report))
    }
}
