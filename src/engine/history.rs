//! History tracker — day-bucketed value log and change alerts.
//!
//! Each run loads the log, writes today's total (overwriting an earlier
//! same-day run), persists the sorted log, then compares today's value with
//! the most recent earlier day and notifies when the rise crosses the
//! configured threshold.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::alerts::{Notifier, ValueAlert};
use crate::storage;
use crate::types::{CollectionSnapshot, HistoryLog};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// History CSV location.
    pub path: PathBuf,
    /// Minimum day-over-day rise, in percent, that triggers an alert.
    pub alert_threshold_pct: Decimal,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("collection_history.csv"),
            alert_threshold_pct: dec!(10.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Change detection
// ---------------------------------------------------------------------------

/// Percent change from `prior` to `today`. `None` unless `prior > 0` and
/// the result fits in a `Decimal`.
pub fn percent_change(prior: Decimal, today: Decimal) -> Option<Decimal> {
    if prior <= Decimal::ZERO {
        return None;
    }
    today
        .checked_sub(prior)
        .and_then(|delta| delta.checked_div(prior))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
}

/// Whether a move from `prior` to `today` is an alert-worthy rise.
pub fn evaluate_change(prior: Decimal, today: Decimal, threshold_pct: Decimal) -> bool {
    percent_change(prior, today).is_some_and(|pct| pct >= threshold_pct)
}

/// Day-over-day comparison against the most recent earlier day.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub previous: CollectionSnapshot,
    pub current: CollectionSnapshot,
    /// `None` when the previous value was zero or negative.
    pub change_pct: Option<Decimal>,
}

impl ValueChange {
    pub fn new(previous: CollectionSnapshot, current: CollectionSnapshot) -> Self {
        let change_pct = percent_change(previous.total_value, current.total_value);
        Self { previous, current, change_pct }
    }

    pub fn exceeds(&self, threshold_pct: Decimal) -> bool {
        self.change_pct.is_some_and(|pct| pct >= threshold_pct)
    }

    fn to_alert(&self) -> Option<ValueAlert> {
        self.change_pct.map(|change_pct| ValueAlert {
            date: self.current.date,
            total_value: self.current.total_value,
            previous_date: self.previous.date,
            previous_value: self.previous.total_value,
            change_pct,
        })
    }
}

/// What happened to the alert this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertStatus {
    /// First run, or the previous value was not positive.
    NoBaseline,
    BelowThreshold,
    /// Threshold crossed but no notification target is configured.
    Disabled,
    Sent,
    Failed(String),
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::NoBaseline => write!(f, "no baseline"),
            AlertStatus::BelowThreshold => write!(f, "below threshold"),
            AlertStatus::Disabled => write!(f, "disabled"),
            AlertStatus::Sent => write!(f, "sent"),
            AlertStatus::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Result of recording one day's value.
#[derive(Debug, Clone)]
pub struct HistoryOutcome {
    pub snapshot: CollectionSnapshot,
    /// True if an earlier same-day entry was overwritten.
    pub replaced: bool,
    pub change: Option<ValueChange>,
    pub alert: AlertStatus,
    /// The log as persisted.
    pub log: HistoryLog,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

pub struct HistoryTracker {
    config: HistoryConfig,
    notifier: Option<Box<dyn Notifier>>,
}

impl HistoryTracker {
    /// `notifier: None` silently disables alerting.
    pub fn new(config: HistoryConfig, notifier: Option<Box<dyn Notifier>>) -> Self {
        Self { config, notifier }
    }

    /// Record today's collection value and run the alert check.
    ///
    /// The log is persisted before any notification is attempted, so a
    /// failed webhook never loses the day's entry.
    pub async fn record(&self, today: NaiveDate, total_value: Decimal) -> Result<HistoryOutcome> {
        let path = self.config.path.as_path();

        let mut log = storage::load_history(Some(path))?;
        let replaced = log.upsert(today, total_value);
        log.normalize();
        storage::save_history(&log, Some(path))?;

        let snapshot = CollectionSnapshot { date: today, total_value };
        info!(
            date = %today,
            total = format!("${:.2}", total_value.round_dp(2)),
            replaced,
            entries = log.len(),
            "History updated"
        );

        let change = log
            .prior_value(today)
            .map(|prev| ValueChange::new(*prev, snapshot));
        let alert = self.check_alert(change.as_ref()).await;

        Ok(HistoryOutcome { snapshot, replaced, change, alert, log })
    }

    async fn check_alert(&self, change: Option<&ValueChange>) -> AlertStatus {
        let Some(change) = change else {
            debug!("No earlier history, skipping change check");
            return AlertStatus::NoBaseline;
        };
        let Some(alert) = change.to_alert() else {
            debug!(previous = %change.previous.total_value, "Previous value not positive, skipping change check");
            return AlertStatus::NoBaseline;
        };

        info!(
            previous_date = %change.previous.date,
            change_pct = %alert.change_pct.round_dp(2),
            threshold = %self.config.alert_threshold_pct,
            "Day-over-day change"
        );

        if !change.exceeds(self.config.alert_threshold_pct) {
            return AlertStatus::BelowThreshold;
        }

        let Some(notifier) = &self.notifier else {
            debug!("Threshold crossed but no notifier configured");
            return AlertStatus::Disabled;
        };

        match notifier.notify(&alert).await {
            Ok(()) => {
                info!(notifier = notifier.name(), change_pct = %alert.change_pct.round_dp(2), "Value alert sent");
                AlertStatus::Sent
            }
            Err(e) => {
                error!(notifier = notifier.name(), error = %e, "Failed to send value alert");
                AlertStatus::Failed(e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::MockNotifier;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn tracker(dir: &tempfile::TempDir, notifier: Option<Box<dyn Notifier>>) -> HistoryTracker {
        HistoryTracker::new(
            HistoryConfig {
                path: dir.path().join("history.csv"),
                alert_threshold_pct: dec!(10.0),
            },
            notifier,
        )
    }

    fn seed(dir: &tempfile::TempDir, rows: &str) {
        std::fs::write(dir.path().join("history.csv"), rows).unwrap();
    }

    fn expecting_alerts(count: usize) -> Box<dyn Notifier> {
        let mut mock = MockNotifier::new();
        mock.expect_notify().times(count).returning(|_| Ok(()));
        mock.expect_name().times(count).return_const("mock");
        Box::new(mock)
    }

    // -- Percent change --

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(dec!(100.00), dec!(111.00)), Some(dec!(11)));
        assert_eq!(percent_change(dec!(100.00), dec!(109.00)), Some(dec!(9)));
        assert_eq!(percent_change(dec!(200), dec!(150)), Some(dec!(-25)));
        assert_eq!(percent_change(Decimal::ZERO, dec!(10)), None);
        assert_eq!(percent_change(dec!(-5), dec!(10)), None);
    }

    #[test]
    fn test_percent_change_overflow_is_none() {
        assert_eq!(percent_change(dec!(0.01), Decimal::MAX), None);
        assert!(!evaluate_change(dec!(0.01), Decimal::MAX, dec!(10)));
    }

    #[test]
    fn test_evaluate_change() {
        assert!(evaluate_change(dec!(100), dec!(111), dec!(10)));
        assert!(!evaluate_change(dec!(100), dec!(109), dec!(10)));
        assert!(!evaluate_change(Decimal::ZERO, dec!(500), dec!(10)));
        assert!(!evaluate_change(dec!(100), dec!(50), dec!(10)));
    }

    #[test]
    fn test_exceeds_threshold_inclusive() {
        let prev = CollectionSnapshot { date: day(15), total_value: dec!(100) };
        let at = ValueChange::new(prev, CollectionSnapshot { date: day(16), total_value: dec!(110) });
        assert!(at.exceeds(dec!(10)));
        let below = ValueChange::new(prev, CollectionSnapshot { date: day(16), total_value: dec!(109) });
        assert!(!below.exceeds(dec!(10)));
    }

    // -- Record --

    #[tokio::test]
    async fn test_first_run_no_alert() {
        let dir = tempfile::tempdir().unwrap();
        let t = tracker(&dir, Some(expecting_alerts(0)));

        let outcome = t.record(day(16), dec!(50)).await.unwrap();
        assert!(!outcome.replaced);
        assert!(outcome.change.is_none());
        assert_eq!(outcome.alert, AlertStatus::NoBaseline);
        assert_eq!(outcome.log.len(), 1);
    }

    #[tokio::test]
    async fn test_alert_fires_at_eleven_percent() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-15,100.00\n");

        let mut mock = MockNotifier::new();
        mock.expect_notify()
            .withf(|a| a.change_pct == dec!(11) && a.previous_date == NaiveDate::from_ymd_opt(2026, 10, 15).unwrap())
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_name().times(1).return_const("mock");
        let t = tracker(&dir, Some(Box::new(mock)));

        let outcome = t.record(day(16), dec!(111.00)).await.unwrap();
        assert_eq!(outcome.alert, AlertStatus::Sent);
        assert_eq!(outcome.change.unwrap().change_pct, Some(dec!(11)));
    }

    #[tokio::test]
    async fn test_no_alert_at_nine_percent() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-15,100.00\n");
        let t = tracker(&dir, Some(expecting_alerts(0)));

        let outcome = t.record(day(16), dec!(109.00)).await.unwrap();
        assert_eq!(outcome.alert, AlertStatus::BelowThreshold);
    }

    #[tokio::test]
    async fn test_drop_does_not_alert() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-15,100.00\n");
        let t = tracker(&dir, Some(expecting_alerts(0)));

        let outcome = t.record(day(16), dec!(50.00)).await.unwrap();
        assert_eq!(outcome.alert, AlertStatus::BelowThreshold);
    }

    #[tokio::test]
    async fn test_zero_prior_no_alert() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-15,0.00\n");
        let t = tracker(&dir, Some(expecting_alerts(0)));

        let outcome = t.record(day(16), dec!(10.00)).await.unwrap();
        assert_eq!(outcome.alert, AlertStatus::NoBaseline);
    }

    #[tokio::test]
    async fn test_no_notifier_disables_alert() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-15,100.00\n");
        let t = tracker(&dir, None);

        let outcome = t.record(day(16), dec!(150.00)).await.unwrap();
        assert_eq!(outcome.alert, AlertStatus::Disabled);
    }

    #[tokio::test]
    async fn test_notifier_failure_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-15,100.00\n");

        let mut mock = MockNotifier::new();
        mock.expect_notify()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        mock.expect_name().times(1).return_const("mock");
        let t = tracker(&dir, Some(Box::new(mock)));

        let outcome = t.record(day(16), dec!(200.00)).await.unwrap();
        assert_eq!(outcome.alert, AlertStatus::Failed("connection refused".to_string()));
        // The day's entry was still committed
        let log = storage::load_history(Some(&dir.path().join("history.csv"))).unwrap();
        assert_eq!(log.get(day(16)), Some(dec!(200.00)));
    }

    #[tokio::test]
    async fn test_same_day_rerun_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-15,100.00\n");
        let t = tracker(&dir, None);

        let first = t.record(day(16), dec!(105.00)).await.unwrap();
        assert!(!first.replaced);
        let second = t.record(day(16), dec!(107.50)).await.unwrap();
        assert!(second.replaced);

        // Baseline is still yesterday, not the earlier same-day run
        assert_eq!(second.change.unwrap().previous.date, day(15));

        let text = std::fs::read_to_string(dir.path().join("history.csv")).unwrap();
        assert_eq!(text, "Date,Total Value\n2026-10-15,100.00\n2026-10-16,107.50\n");
    }

    #[tokio::test]
    async fn test_baseline_skips_gaps() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-01,80.00\n2026-10-09,100.00\n");
        let t = tracker(&dir, Some(expecting_alerts(1)));

        let outcome = t.record(day(16), dec!(120.00)).await.unwrap();
        let change = outcome.change.unwrap();
        assert_eq!(change.previous.date, day(9));
        assert_eq!(change.change_pct, Some(dec!(20)));
        assert_eq!(outcome.alert, AlertStatus::Sent);
    }

    #[tokio::test]
    async fn test_disturbed_file_is_sorted_on_write() {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir, "Date,Total Value\n2026-10-14,3\ngarbage\n2026-10-12,1\n2026-10-13,2\n");
        let t = tracker(&dir, None);

        t.record(day(15), dec!(4)).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("history.csv")).unwrap();
        assert_eq!(
            text,
            "Date,Total Value\n2026-10-12,1.00\n2026-10-13,2.00\n2026-10-14,3.00\n2026-10-15,4.00\n"
        );
    }

    #[test]
    fn test_alert_status_display() {
        assert_eq!(AlertStatus::Sent.to_string(), "sent");
        assert_eq!(AlertStatus::Failed("x".into()).to_string(), "failed: x");
    }
}
