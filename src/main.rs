//! Card Tracker — collection value tracking for Magic and Yu-Gi-Oh!
//!
//! Entry point. Initialises structured logging, loads configuration, builds
//! one catalog resolver per enabled game, then runs a single
//! collect → value → record → report pass.

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};
use uuid::Uuid;

use card_tracker::alerts::{Notifier, WebhookNotifier};
use card_tracker::catalog::scryfall::MagicResolver;
use card_tracker::catalog::ygoprodeck::YuGiOhResolver;
use card_tracker::catalog::{CardResolver, Throttle};
use card_tracker::config::{self, GameConfig};
use card_tracker::engine::collector::Collector;
use card_tracker::engine::history::{HistoryConfig, HistoryTracker};
use card_tracker::engine::run_once;
use card_tracker::report::{ChartSink, HtmlSink, ReportSink, SpreadsheetSink};
use card_tracker::types::Game;

/// Env var naming an alternate config file.
const CONFIG_ENV: &str = "CARD_TRACKER_CONFIG";
const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let cfg = config::AppConfig::load_or_default(&config_path)?;

    let run_id = Uuid::new_v4();
    let today = Local::now().date_naive();
    info!(
        run_id = %run_id,
        date = %today,
        config = %config_path,
        games = cfg.enabled_games().count(),
        "Card tracker starting"
    );

    std::fs::create_dir_all(&cfg.tracker.output_dir).with_context(|| {
        format!("Failed to create output directory {}", cfg.tracker.output_dir.display())
    })?;

    // -- Initialise components -------------------------------------------

    let games: Vec<GameConfig> = cfg.enabled_games().cloned().collect();
    if games.is_empty() {
        warn!("No games enabled in config");
    }

    let resolvers = build_resolvers(&games, &cfg.tracker.user_agent)?;
    let mut collector = Collector::new(resolvers, Throttle::new(cfg.request_delay()));

    let notifier = WebhookNotifier::from_env(cfg.alerts.webhook_url_env.as_deref())?
        .map(|n| Box::new(n) as Box<dyn Notifier>);
    let tracker = HistoryTracker::new(
        HistoryConfig {
            path: cfg.history.path.clone(),
            alert_threshold_pct: cfg.alerts.threshold_pct,
        },
        notifier,
    );

    let sinks = build_sinks(&cfg);

    // -- Run -------------------------------------------------------------

    run_once(run_id, today, &mut collector, &games, &tracker, &sinks).await?;

    Ok(())
}

/// One resolver per distinct enabled game.
fn build_resolvers(games: &[GameConfig], user_agent: &str) -> Result<Vec<Box<dyn CardResolver>>> {
    let mut resolvers: Vec<Box<dyn CardResolver>> = Vec::new();

    for game in games.iter().map(|g| g.game) {
        if resolvers.iter().any(|r| r.game() == game) {
            continue;
        }
        let resolver: Box<dyn CardResolver> = match game {
            Game::Magic => Box::new(MagicResolver::from_user_agent(user_agent)?),
            Game::YuGiOh => Box::new(YuGiOhResolver::from_user_agent(user_agent)?),
        };
        info!(game = %game, catalog = resolver.name(), "Catalog ready");
        resolvers.push(resolver);
    }

    Ok(resolvers)
}

/// Report sinks switched on in config, in a fixed order.
fn build_sinks(cfg: &config::AppConfig) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();

    if let Some(name) = &cfg.reports.spreadsheet {
        sinks.push(Box::new(SpreadsheetSink::new(cfg.report_path(name))));
    }
    if let Some(name) = &cfg.reports.chart {
        sinks.push(Box::new(ChartSink::new(cfg.report_path(name))));
    }
    if let Some(name) = &cfg.reports.html {
        sinks.push(Box::new(HtmlSink::new(cfg.report_path(name))));
    }

    sinks
}

/// Initialise the `tracing` subscriber.
///
/// Uses `RUST_LOG` if set, otherwise defaults to `card_tracker=info`.
/// Set `CARD_TRACKER_LOG_JSON=1` for machine-readable output.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("card_tracker=info"));

    let json_logging = std::env::var("CARD_TRACKER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
