//! End-to-end pipeline tests.
//!
//! Drives normalizer → collector → valuation → history → reports against
//! mock catalogs, with every file in a scratch directory.

mod mock_catalog;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use card_tracker::alerts::Notifier;
use card_tracker::catalog::{CardResolver, Throttle};
use card_tracker::config::GameConfig;
use card_tracker::engine::collector::Collector;
use card_tracker::engine::history::{AlertStatus, HistoryConfig, HistoryTracker};
use card_tracker::engine::run_once;
use card_tracker::report::{ChartSink, HtmlSink, ReportSink, SpreadsheetSink};
use card_tracker::storage;
use card_tracker::types::{Game, Price};

use mock_catalog::{MockCatalog, RecordingNotifier};

const MAGIC_CARDS: &str = "2x Lightning Bolt | 0.50\nCounterspell\n\n2x Lightning Bolt | 0.50\nMystery Card\nBlack Lotus (LEA)\n";
const YUGIOH_CARDS: &str = "3x Dark Magician | $2.00\n";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

struct Fixture {
    dir: tempfile::TempDir,
    games: Vec<GameConfig>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my_cards.txt"), MAGIC_CARDS).unwrap();
        std::fs::write(dir.path().join("my_yugioh_cards.txt"), YUGIOH_CARDS).unwrap();

        let games = vec![
            GameConfig {
                game: Game::Magic,
                input: dir.path().join("my_cards.txt"),
                enabled: true,
            },
            GameConfig {
                game: Game::YuGiOh,
                input: dir.path().join("my_yugioh_cards.txt"),
                enabled: true,
            },
        ];

        Self { dir, games }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn tracker(&self, notifier: Option<Box<dyn Notifier>>) -> HistoryTracker {
        HistoryTracker::new(
            HistoryConfig {
                path: self.path("collection_history.csv"),
                alert_threshold_pct: dec!(10.0),
            },
            notifier,
        )
    }

    fn sinks(&self) -> Vec<Box<dyn ReportSink>> {
        vec![
            Box::new(SpreadsheetSink::new(self.path("card_prices.csv"))),
            Box::new(ChartSink::new(self.path("collection_value.svg"))),
            Box::new(HtmlSink::new(self.path("collection.html"))),
        ]
    }
}

fn magic_catalog() -> MockCatalog {
    MockCatalog::new(Game::Magic)
        .with_card("Lightning Bolt", Price::Known(dec!(1.20)))
        .with_card("Counterspell", Price::Known(dec!(0.80)))
        .with_card("Black Lotus", Price::Unavailable)
}

fn yugioh_catalog() -> MockCatalog {
    MockCatalog::new(Game::YuGiOh).with_card("Dark Magician", Price::Known(dec!(1.00)))
}

fn collector(resolvers: Vec<Box<dyn CardResolver>>) -> Collector {
    Collector::new(resolvers, Throttle::new(Duration::ZERO))
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_full_pipeline_first_run() {
    let fx = Fixture::new();
    let magic = magic_catalog();
    let magic_lookups = magic.lookups();
    let mut collector = collector(vec![Box::new(magic), Box::new(yugioh_catalog())]);
    let notifier = RecordingNotifier::new();
    let tracker = fx.tracker(Some(Box::new(notifier.clone())));

    let summary = run_once(Uuid::new_v4(), day(15), &mut collector, &fx.games, &tracker, &fx.sinks())
        .await
        .unwrap();

    // Input deduplicated in place; one lookup per distinct line
    assert_eq!(
        read(&fx.path("my_cards.txt")),
        "2x Lightning Bolt | 0.50\nCounterspell\nMystery Card\nBlack Lotus (LEA)\n"
    );
    assert_eq!(magic_lookups.lock().unwrap().len(), 4);

    assert_eq!(summary.priced, 3);
    assert_eq!(summary.unpriced, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total_value, dec!(6.20));
    assert_eq!(summary.total_profit_loss, dec!(-1.60));
    assert_eq!(summary.alert, AlertStatus::NoBaseline);
    assert_eq!(summary.reports_written, 3);
    assert_eq!(summary.reports_failed, 0);
    assert!(notifier.sent().is_empty());

    assert_eq!(
        read(&fx.path("collection_history.csv")),
        "Date,Total Value\n2026-10-15,6.20\n"
    );

    let csv = read(&fx.path("card_prices.csv"));
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 6);
    assert_eq!(
        rows[1],
        "2026-10-15,Yu-Gi-Oh!,Dark Magician,Mock Set (yugioh),3,1.00,3.00,2.00,-3.00"
    );
    assert_eq!(rows[2], "2026-10-15,Magic,Lightning Bolt,Mock Set (magic),2,1.20,2.40,0.50,1.40");
    assert_eq!(rows[3], "2026-10-15,Magic,Counterspell,Mock Set (magic),1,0.80,0.80,,");
    assert_eq!(rows[4], "2026-10-15,Magic,Black Lotus,Mock Set (magic),1,N/A,N/A,,");
    assert_eq!(rows[5], "2026-10-15,,TOTAL,,7,,6.20,,-1.60");

    let html = read(&fx.path("collection.html"));
    assert!(html.contains("Total value: <b>$6.20</b>"));
    assert!(html.contains("<span>Yu-Gi-Oh!: <b>$3.00</b></span>"));
    assert!(html.contains(r#"href="https://cards.example.com/magic/lightning-bolt""#));

    let svg = read(&fx.path("collection_value.svg"));
    assert_eq!(svg.matches("<circle").count(), 1);
}

#[tokio::test]
async fn test_rising_value_sends_alert_next_day() {
    let fx = Fixture::new();
    let magic = magic_catalog();
    let magic_prices = magic.prices();
    let mut collector = collector(vec![Box::new(magic), Box::new(yugioh_catalog())]);
    let notifier = RecordingNotifier::new();
    let tracker = fx.tracker(Some(Box::new(notifier.clone())));
    let sinks = fx.sinks();

    run_once(Uuid::new_v4(), day(15), &mut collector, &fx.games, &tracker, &sinks)
        .await
        .unwrap();

    {
        let mut prices = magic_prices.lock().unwrap();
        prices.insert("Lightning Bolt".to_string(), Price::Known(dec!(1.50)));
        prices.insert("Counterspell".to_string(), Price::Known(dec!(1.50)));
    }

    let summary = run_once(Uuid::new_v4(), day(16), &mut collector, &fx.games, &tracker, &sinks)
        .await
        .unwrap();

    // 6.20 -> 7.50 is roughly +20.97%
    assert_eq!(summary.total_value, dec!(7.50));
    assert_eq!(summary.alert, AlertStatus::Sent);
    let change = summary.change_pct.unwrap();
    assert!(change > dec!(20.9) && change < dec!(21.0), "unexpected change {change}");

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].previous_date, day(15));
    assert_eq!(sent[0].previous_value, dec!(6.20));
    assert!(sent[0].message().contains("$7.50"));

    assert_eq!(
        read(&fx.path("collection_history.csv")),
        "Date,Total Value\n2026-10-15,6.20\n2026-10-16,7.50\n"
    );
    let svg = read(&fx.path("collection_value.svg"));
    assert_eq!(svg.matches("<circle").count(), 2);
}

#[tokio::test]
async fn test_same_day_rerun_keeps_one_row() {
    let fx = Fixture::new();
    let mut collector = collector(vec![Box::new(magic_catalog()), Box::new(yugioh_catalog())]);
    let notifier = RecordingNotifier::new();
    let tracker = fx.tracker(Some(Box::new(notifier.clone())));
    let sinks = fx.sinks();

    for _ in 0..3 {
        run_once(Uuid::new_v4(), day(16), &mut collector, &fx.games, &tracker, &sinks)
            .await
            .unwrap();
    }

    assert_eq!(
        read(&fx.path("collection_history.csv")),
        "Date,Total Value\n2026-10-16,6.20\n"
    );
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_missing_input_file_skips_only_that_game() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.path("my_yugioh_cards.txt")).unwrap();

    let ygo = yugioh_catalog();
    let ygo_lookups = ygo.lookups();
    let mut collector = collector(vec![Box::new(magic_catalog()), Box::new(ygo)]);
    let tracker = fx.tracker(None);

    let summary = run_once(Uuid::new_v4(), day(15), &mut collector, &fx.games, &tracker, &fx.sinks())
        .await
        .unwrap();

    assert!(ygo_lookups.lock().unwrap().is_empty());
    assert_eq!(summary.total_value, dec!(3.20));
    assert_eq!(summary.total_profit_loss, dec!(1.40));
}

#[tokio::test]
async fn test_report_failure_does_not_block_history_or_other_reports() {
    let fx = Fixture::new();
    let mut collector = collector(vec![Box::new(magic_catalog()), Box::new(yugioh_catalog())]);
    let tracker = fx.tracker(None);
    let sinks: Vec<Box<dyn ReportSink>> = vec![
        Box::new(SpreadsheetSink::new(fx.path("missing_dir").join("card_prices.csv"))),
        Box::new(HtmlSink::new(fx.path("collection.html"))),
    ];

    let summary = run_once(Uuid::new_v4(), day(15), &mut collector, &fx.games, &tracker, &sinks)
        .await
        .unwrap();

    assert_eq!(summary.reports_failed, 1);
    assert_eq!(summary.reports_written, 1);
    assert!(fx.path("collection.html").exists());
    let log = storage::load_history(Some(&fx.path("collection_history.csv"))).unwrap();
    assert_eq!(log.get(day(15)), Some(dec!(6.20)));
}

#[tokio::test]
async fn test_failed_webhook_is_not_fatal() {
    let fx = Fixture::new();
    std::fs::write(fx.path("collection_history.csv"), "Date,Total Value\n2026-10-14,1.00\n").unwrap();

    let mut collector = collector(vec![Box::new(magic_catalog()), Box::new(yugioh_catalog())]);
    let notifier = RecordingNotifier::failing();
    let tracker = fx.tracker(Some(Box::new(notifier.clone())));

    let summary = run_once(Uuid::new_v4(), day(15), &mut collector, &fx.games, &tracker, &fx.sinks())
        .await
        .unwrap();

    assert_eq!(notifier.sent().len(), 1);
    assert!(matches!(summary.alert, AlertStatus::Failed(_)));
    assert_eq!(summary.reports_written, 3);
    assert_eq!(
        read(&fx.path("collection_history.csv")),
        "Date,Total Value\n2026-10-14,1.00\n2026-10-15,6.20\n"
    );
}
