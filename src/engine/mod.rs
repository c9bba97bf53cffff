//! Core engine — collect → value → record → report.

pub mod collector;
pub mod history;
pub mod valuation;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::report::{render_all, CollectionReport, ReportSink};
use collector::Collector;
use history::{AlertStatus, HistoryTracker};
use valuation::Valuation;

/// End-of-run figures, logged once the pipeline finishes.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub priced: usize,
    pub unpriced: usize,
    pub skipped: usize,
    pub total_value: Decimal,
    pub total_profit_loss: Decimal,
    pub change_pct: Option<Decimal>,
    pub alert: AlertStatus,
    pub reports_written: usize,
    pub reports_failed: usize,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            date = %self.date,
            priced = self.priced,
            unpriced = self.unpriced,
            skipped = self.skipped,
            total = format!("${:.2}", self.total_value.round_dp(2)),
            profit_loss = format!("${:.2}", self.total_profit_loss.round_dp(2)),
            change_pct = ?self.change_pct.map(|p| p.round_dp(2)),
            alert = %self.alert,
            reports_written = self.reports_written,
            reports_failed = self.reports_failed,
            "Run complete"
        );
    }
}

/// One full pass over the collection.
///
/// History is committed before any report is rendered; report failures
/// are counted in the summary, never returned.
pub async fn run_once(
    run_id: Uuid,
    today: NaiveDate,
    collector: &mut Collector,
    games: &[GameConfig],
    tracker: &HistoryTracker,
    sinks: &[Box<dyn ReportSink>],
) -> Result<RunSummary> {
    let run = collector.collect(games).await;
    let skipped = run.skipped.len();

    let valuation = Valuation::from_matches(run.matches);
    let outcome = tracker.record(today, valuation.total_value).await?;

    let report = CollectionReport {
        date: today,
        valuation: &valuation,
        history: &outcome.log,
    };
    let outcomes = render_all(sinks, &report);
    let reports_failed = outcomes.iter().filter(|o| !o.is_ok()).count();

    let summary = RunSummary {
        run_id,
        date: today,
        priced: valuation.priced_count(),
        unpriced: valuation.unpriced_count(),
        skipped,
        total_value: valuation.total_value,
        total_profit_loss: valuation.total_profit_loss,
        change_pct: outcome.change.and_then(|c| c.change_pct),
        alert: outcome.alert,
        reports_written: outcomes.len() - reports_failed,
        reports_failed,
    };
    summary.log();

    Ok(summary)
}
