//! Shared types for the card tracker.
//!
//! These types form the data model passed between the normalizer,
//! the catalog resolvers, the valuation aggregator, the history tracker
//! and the report sinks. None of them depend on a particular catalog API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// A supported trading card game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    #[serde(alias = "mtg")]
    Magic,
    #[serde(alias = "ygo", alias = "yu-gi-oh")]
    YuGiOh,
}

impl Game {
    /// Short lowercase identifier used in config files and logs.
    pub fn slug(&self) -> &'static str {
        match self {
            Game::Magic => "magic",
            Game::YuGiOh => "yugioh",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Game::Magic => write!(f, "Magic"),
            Game::YuGiOh => write!(f, "Yu-Gi-Oh!"),
        }
    }
}

impl std::str::FromStr for Game {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "magic" | "mtg" => Ok(Game::Magic),
            "yugioh" | "ygo" | "yu-gi-oh" | "yu-gi-oh!" => Ok(Game::YuGiOh),
            other => Err(TrackerError::Config(format!("Unknown game: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Card request
// ---------------------------------------------------------------------------

/// One parsed line of a collection input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRequest {
    /// The stripped input line exactly as the user wrote it.
    pub raw_line: String,
    pub game: Game,
    /// Search name with quantity, annotations and suffixes removed.
    pub name: String,
    /// Always >= 1.
    pub quantity: u32,
    pub collector_number: Option<String>,
    /// Set hint from the `Name - Set` form. Only Magic queries use it.
    pub set_hint: Option<String>,
    /// Per-unit acquisition price.
    pub cost_basis: Option<Decimal>,
    /// Zero-based position across the whole run, used as the sort tie-breaker.
    pub position: usize,
}

impl fmt::Display for CardRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x {} [{}]", self.quantity, self.name, self.game)?;
        if let Some(cn) = &self.collector_number {
            write!(f, " #{cn}")?;
        }
        if let Some(set) = &self.set_hint {
            write!(f, " ({set})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// A catalog price. Catalogs regularly omit prices for obscure printings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Price {
    Known(Decimal),
    Unavailable,
}

impl Price {
    /// Parse a catalog price string. Empty or unparsable text is `Unavailable`.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<Decimal>().ok())
            .map(Price::Known)
            .unwrap_or(Price::Unavailable)
    }

    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Price::Known(d) => Some(*d),
            Price::Unavailable => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Price::Known(_))
    }

    /// Multiply a known price by a quantity. `Unavailable` stays unavailable,
    /// and so does a product too large to represent.
    pub fn times(&self, quantity: u32) -> Price {
        match self {
            Price::Known(d) => d
                .checked_mul(Decimal::from(quantity))
                .map(Price::Known)
                .unwrap_or(Price::Unavailable),
            Price::Unavailable => Price::Unavailable,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Known(d) => write!(f, "{:.2}", d.round_dp(2)),
            Price::Unavailable => write!(f, "N/A"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved card
// ---------------------------------------------------------------------------

/// A catalog entry matched to a `CardRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCard {
    pub game: Game,
    /// Display name (flavor/alternate name when the catalog has one).
    pub name: String,
    pub set_name: String,
    pub unit_price: Price,
    pub image_url: Option<String>,
    /// Link to the catalog's detail page for this printing.
    pub detail_uri: String,
}

impl fmt::Display for ResolvedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - ${}", self.name, self.set_name, self.unit_price)
    }
}

impl ResolvedCard {
    /// Helper to build a test card with sensible defaults.
    #[cfg(test)]
    pub fn sample(name: &str, price: Price) -> Self {
        ResolvedCard {
            game: Game::Magic,
            name: name.to_string(),
            set_name: "Magic 2010".to_string(),
            unit_price: price,
            image_url: Some(format!("https://img.example.com/{name}.jpg")),
            detail_uri: format!("https://scryfall.com/card/m10/{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Collection snapshot
// ---------------------------------------------------------------------------

/// Total collection value on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub date: NaiveDate,
    pub total_value: Decimal,
}

impl fmt::Display for CollectionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ${:.2}", self.date.format("%Y-%m-%d"), self.total_value.round_dp(2))
    }
}

// ---------------------------------------------------------------------------
// History log
// ---------------------------------------------------------------------------

/// Day-bucketed series of collection values.
///
/// Invariants: at most one entry per date, entries ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    entries: Vec<CollectionSnapshot>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from rows in any order. A repeated date keeps the value
    /// of its last row.
    pub fn from_entries(entries: impl IntoIterator<Item = CollectionSnapshot>) -> Self {
        let mut log = Self::new();
        for entry in entries {
            log.upsert(entry.date, entry.total_value);
        }
        log
    }

    pub fn entries(&self) -> &[CollectionSnapshot] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<Decimal> {
        self.entries.iter().find(|e| e.date == date).map(|e| e.total_value)
    }

    pub fn latest(&self) -> Option<&CollectionSnapshot> {
        self.entries.last()
    }

    /// Set the value for `date`, overwriting an existing entry in place.
    /// Returns true if an entry was replaced.
    pub fn upsert(&mut self, date: NaiveDate, total_value: Decimal) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.date == date) {
            existing.total_value = total_value;
            return true;
        }
        self.entries.push(CollectionSnapshot { date, total_value });
        self.normalize();
        false
    }

    /// Re-sort ascending by date.
    pub fn normalize(&mut self) {
        self.entries.sort_by_key(|e| e.date);
    }

    /// The newest entry dated strictly before `today`: the baseline for
    /// day-over-day change. `None` on the first ever run.
    pub fn prior_value(&self, today: NaiveDate) -> Option<&CollectionSnapshot> {
        self.entries.iter().rev().find(|e| e.date < today)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types. Only `Config` and catastrophic I/O end a run;
/// the rest are reported per card, per row or per artifact.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Input file not found: {path}")]
    InputMissing { path: String },

    #[error("Catalog error ({game}): {message}")]
    Catalog { game: Game, message: String },

    #[error("Parse error ({context}): {message}")]
    Parse { context: String, message: String },

    #[error("Failed to write {artifact}: {message}")]
    OutputWrite { artifact: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
