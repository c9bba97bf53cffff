//! Mock catalog and notifier for integration testing.
//!
//! Provides a deterministic `CardResolver` that prices cards from an
//! in-memory table, and a `Notifier` that records alerts instead of
//! sending them. No network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use card_tracker::alerts::{Notifier, ValueAlert};
use card_tracker::catalog::CardResolver;
use card_tracker::types::{CardRequest, Game, Price, ResolvedCard};

/// A mock catalog for one game.
///
/// Cards not in the table resolve to `None`, the same as a real catalog
/// whose every query tier came back empty.
pub struct MockCatalog {
    game: Game,
    prices: Arc<Mutex<HashMap<String, Price>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockCatalog {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            prices: Arc::new(Mutex::new(HashMap::new())),
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add or reprice a card.
    pub fn with_card(self, name: &str, price: Price) -> Self {
        self.prices.lock().unwrap().insert(name.to_string(), price);
        self
    }

    /// Handle for repricing between runs once the catalog is boxed.
    pub fn prices(&self) -> Arc<Mutex<HashMap<String, Price>>> {
        self.prices.clone()
    }

    /// Handle on the names looked up so far.
    pub fn lookups(&self) -> Arc<Mutex<Vec<String>>> {
        self.lookups.clone()
    }
}

#[async_trait]
impl CardResolver for MockCatalog {
    fn game(&self) -> Game {
        self.game
    }

    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, request: &CardRequest) -> Option<ResolvedCard> {
        self.lookups.lock().unwrap().push(request.name.clone());
        let price = *self.prices.lock().unwrap().get(&request.name)?;

        let slug = request.name.to_lowercase().replace(' ', "-");
        Some(ResolvedCard {
            game: self.game,
            name: request.name.clone(),
            set_name: format!("Mock Set ({})", self.game.slug()),
            unit_price: price,
            image_url: Some(format!("https://img.example.com/{slug}.jpg")),
            detail_uri: format!("https://cards.example.com/{}/{slug}", self.game.slug()),
        })
    }
}

/// Records every alert; optionally fails each delivery.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<ValueAlert>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<ValueAlert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, alert: &ValueAlert) -> Result<()> {
        self.sent.lock().unwrap().push(alert.clone());
        if self.fail {
            return Err(anyhow!("webhook unreachable"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
