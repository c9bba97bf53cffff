//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the webhook URL) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`. Every section has defaults,
//! so a missing file or section yields a working configuration.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::types::Game;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub games: Vec<GameConfig>,
    pub history: HistoryFileConfig,
    pub alerts: AlertsConfig,
    pub reports: ReportsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            games: default_games(),
            history: HistoryFileConfig::default(),
            alerts: AlertsConfig::default(),
            reports: ReportsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackerConfig {
    /// Pause between successive card lookups, across all games.
    pub request_delay_ms: u64,
    /// Directory that report artifacts are written into.
    pub output_dir: PathBuf,
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 100,
            output_dir: PathBuf::from("."),
            user_agent: concat!("card_tracker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    pub game: Game,
    /// Plain-text collection file, one card per line.
    pub input: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryFileConfig {
    pub path: PathBuf,
}

impl Default for HistoryFileConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("collection_history.csv") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    /// Day-over-day increase (percent) that triggers a notification.
    pub threshold_pct: Decimal,
    /// Name of the env var holding the webhook URL. Unset disables alerts.
    pub webhook_url_env: Option<String>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            threshold_pct: dec!(10.0),
            webhook_url_env: Some("CARD_TRACKER_WEBHOOK_URL".to_string()),
        }
    }
}

/// Report file names, relative to `tracker.output_dir`. `None` skips the report.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportsConfig {
    pub spreadsheet: Option<PathBuf>,
    pub chart: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            spreadsheet: Some(PathBuf::from("card_prices.csv")),
            chart: Some(PathBuf::from("collection_value.svg")),
            html: Some(PathBuf::from("collection.html")),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_games() -> Vec<GameConfig> {
    vec![
        GameConfig {
            game: Game::Magic,
            input: PathBuf::from("my_cards.txt"),
            enabled: true,
        },
        GameConfig {
            game: Game::YuGiOh,
            input: PathBuf::from("my_yugioh_cards.txt"),
            enabled: true,
        },
    ]
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load the config file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Games that are switched on, in config order.
    pub fn enabled_games(&self) -> impl Iterator<Item = &GameConfig> {
        self.games.iter().filter(|g| g.enabled)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.tracker.request_delay_ms)
    }

    /// Resolve a report file name against the output directory.
    pub fn report_path(&self, name: &Path) -> PathBuf {
        self.tracker.output_dir.join(name)
    }
}
