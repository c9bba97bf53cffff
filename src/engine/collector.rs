//! Collection run — reads every enabled game's input file and resolves each
//! card against that game's catalog.
//!
//! Lookups are strictly sequential and share one throttle across games.
//! Failures stay local: a missing input file drops that game, an unmatched
//! card drops that card.

use tracing::{debug, error, info, warn};

use crate::catalog::{CardResolver, Throttle};
use crate::config::GameConfig;
use crate::input;
use crate::types::{CardRequest, Game, ResolvedCard, TrackerError};

/// Everything one collection pass produced.
#[derive(Debug, Default)]
pub struct CollectionRun {
    /// Matched cards, paired with the request they answer.
    pub matches: Vec<(CardRequest, ResolvedCard)>,
    /// Requests no catalog tier could match.
    pub skipped: Vec<CardRequest>,
    /// Games dropped before any lookup (missing input, no resolver).
    pub games_skipped: Vec<Game>,
}

impl CollectionRun {
    pub fn requested(&self) -> usize {
        self.matches.len() + self.skipped.len()
    }
}

/// Sequential multi-game collector.
pub struct Collector {
    resolvers: Vec<Box<dyn CardResolver>>,
    throttle: Throttle,
}

impl Collector {
    /// One resolver per game. The first resolver registered for a game wins.
    pub fn new(resolvers: Vec<Box<dyn CardResolver>>, throttle: Throttle) -> Self {
        Self { resolvers, throttle }
    }

    fn resolver_for(&self, game: Game) -> Option<&dyn CardResolver> {
        self.resolvers
            .iter()
            .find(|r| r.game() == game)
            .map(|r| r.as_ref())
    }

    /// Process each game in order. Never fails as a whole.
    pub async fn collect<'a>(
        &mut self,
        games: impl IntoIterator<Item = &'a GameConfig>,
    ) -> CollectionRun {
        let mut run = CollectionRun::default();
        let mut position = 0usize;
        debug!(delay_ms = self.throttle.delay().as_millis() as u64, "Collection run starting");

        for game_cfg in games {
            let game = game_cfg.game;

            if self.resolver_for(game).is_none() {
                warn!(game = %game, "No catalog configured for game, skipping");
                run.games_skipped.push(game);
                continue;
            }

            let requests = match input::load_requests(&game_cfg.input, game, position) {
                Ok(requests) => requests,
                Err(e) => {
                    match e.downcast_ref::<TrackerError>() {
                        Some(TrackerError::InputMissing { path }) => {
                            warn!(game = %game, path = %path, "Input file not found, skipping game");
                        }
                        _ => error!(game = %game, error = %e, "Failed to load input, skipping game"),
                    }
                    run.games_skipped.push(game);
                    continue;
                }
            };
            position += requests.len();

            info!(game = %game, cards = requests.len(), "Resolving cards");
            self.resolve_all(game, requests, &mut run).await;
        }

        info!(
            matched = run.matches.len(),
            skipped = run.skipped.len(),
            games_skipped = run.games_skipped.len(),
            "Collection run complete"
        );

        run
    }

    async fn resolve_all(&mut self, game: Game, requests: Vec<CardRequest>, run: &mut CollectionRun) {
        for request in requests {
            self.throttle.wait().await;

            let Some(resolver) = self.resolver_for(game) else {
                return;
            };
            debug!(catalog = resolver.name(), card = %request.name, "Looking up card");

            match resolver.resolve(&request).await {
                Some(card) => {
                    info!(
                        game = %game,
                        name = %card.name,
                        set = %card.set_name,
                        price = %card.unit_price,
                        "Saved"
                    );
                    run.matches.push((request, card));
                }
                None => {
                    let reason = TrackerError::Catalog {
                        game,
                        message: format!("no {} match", resolver.name()),
                    };
                    warn!(line = %request.raw_line, reason = %reason, "Skipped");
                    run.skipped.push(request);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
