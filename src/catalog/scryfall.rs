//! Scryfall integration for Magic: The Gathering.
//!
//! API docs: https://scryfall.com/docs/api
//! Base URL: https://api.scryfall.com
//! Rate limit: 10 requests/second; Scryfall asks clients to wait 50–100 ms
//! between requests.
//! Auth: none.
//!
//! Resolution runs an ordered query plan (see `query_plan`) and stops at the
//! first tier that returns a card.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{build_http_client, get_json, CardResolver, CatalogError};
use crate::types::{CardRequest, Game, Price, ResolvedCard};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://api.scryfall.com";
const CATALOG_NAME: &str = "scryfall";
const UNKNOWN_SET: &str = "Unknown";

// ---------------------------------------------------------------------------
// API response types (Scryfall JSON → Rust)
// ---------------------------------------------------------------------------

/// Scryfall card object. Only the fields used for pricing are deserialized.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScryfallCard {
    #[serde(default)]
    pub name: String,
    /// Alternate in-universe name printed on some special editions.
    #[serde(default)]
    pub flavor_name: Option<String>,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub prices: ScryfallPrices,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// Present on double-faced cards, which have no top-level `image_uris`.
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub scryfall_uri: Option<String>,
}

/// Prices are decimal strings or null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScryfallPrices {
    #[serde(default)]
    pub usd: Option<String>,
    #[serde(default)]
    pub usd_foil: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUris {
    #[serde(default)]
    pub normal: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardFace {
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

/// Paginated list returned by `/cards/search`.
#[derive(Debug, Deserialize)]
struct ScryfallList {
    #[serde(default)]
    total_cards: u32,
    #[serde(default)]
    data: Vec<ScryfallCard>,
}

// ---------------------------------------------------------------------------
// API seam
// ---------------------------------------------------------------------------

/// The two Scryfall endpoints the resolver needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScryfallApi: Send + Sync {
    /// Full-text search (`/cards/search?q=`). An empty result is `Ok(vec![])`
    /// or `Err(NotFound)` depending on how the server reports it.
    async fn search(&self, query: &str) -> Result<Vec<ScryfallCard>, CatalogError>;

    /// Fuzzy single-card lookup (`/cards/named?fuzzy=`).
    async fn named_fuzzy(&self, name: &str) -> Result<ScryfallCard, CatalogError>;
}

/// reqwest-backed Scryfall client.
pub struct ScryfallClient {
    http: Client,
    base_url: String,
}

impl ScryfallClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        Ok(Self {
            http: build_http_client(user_agent)?,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host (local mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ScryfallApi for ScryfallClient {
    async fn search(&self, query: &str) -> Result<Vec<ScryfallCard>, CatalogError> {
        let url = format!("{}/cards/search?q={}", self.base_url, urlencoding::encode(query));
        let list: ScryfallList = get_json(&self.http, &url).await?;
        debug!(query, total = list.total_cards, "Scryfall search complete");
        Ok(list.data)
    }

    async fn named_fuzzy(&self, name: &str) -> Result<ScryfallCard, CatalogError> {
        let url = format!("{}/cards/named?fuzzy={}", self.base_url, urlencoding::encode(name));
        get_json(&self.http, &url).await
    }
}

// ---------------------------------------------------------------------------
// Query plan
// ---------------------------------------------------------------------------

/// One step of the resolution cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScryfallQuery {
    Search(String),
    Fuzzy(String),
}

/// Drop leading zeros from a collector number (`"007"` → `"7"`, `"000"` → `"0"`).
fn strip_leading_zeros(number: &str) -> &str {
    let stripped = number.trim_start_matches('0');
    if stripped.is_empty() && !number.is_empty() {
        "0"
    } else {
        stripped
    }
}

/// Build the ordered list of queries for a request:
/// exact name + collector number, the same with leading zeros stripped,
/// exact name + set hint, exact name alone, and finally a fuzzy lookup.
pub fn query_plan(request: &CardRequest) -> Vec<ScryfallQuery> {
    let name = request.name.replace('"', "");
    let exact = format!("!\"{name}\"");
    let mut plan = Vec::with_capacity(5);

    if let Some(number) = request.collector_number.as_deref() {
        plan.push(ScryfallQuery::Search(format!("{exact} cn:\"{number}\"")));

        let stripped = strip_leading_zeros(number);
        if stripped != number {
            plan.push(ScryfallQuery::Search(format!("{exact} cn:\"{stripped}\"")));
        }
    }

    if let Some(set) = request.set_hint.as_deref() {
        let set = set.replace('"', "");
        plan.push(ScryfallQuery::Search(format!("{exact} set:\"{set}\"")));
    }

    plan.push(ScryfallQuery::Search(exact));
    plan.push(ScryfallQuery::Fuzzy(request.name.clone()));
    plan
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Magic resolver. Generic over the API so tests can script responses.
pub struct MagicResolver<A: ScryfallApi = ScryfallClient> {
    api: A,
}

impl MagicResolver<ScryfallClient> {
    pub fn from_user_agent(user_agent: &str) -> Result<Self> {
        Ok(Self::new(ScryfallClient::new(user_agent)?))
    }
}

impl<A: ScryfallApi> MagicResolver<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Convert a Scryfall card to the tracker's `ResolvedCard`.
    fn to_resolved(card: ScryfallCard, request: &CardRequest) -> ResolvedCard {
        let unit_price = match Price::parse(card.prices.usd.as_deref()) {
            Price::Unavailable => Price::parse(card.prices.usd_foil.as_deref()),
            known => known,
        };

        let name = card
            .flavor_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(card.name).filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| request.name.clone());

        let image_url = card
            .image_uris
            .and_then(|uris| uris.normal)
            .or_else(|| {
                card.card_faces
                    .and_then(|faces| faces.into_iter().next())
                    .and_then(|face| face.image_uris)
                    .and_then(|uris| uris.normal)
            });

        let detail_uri = card.scryfall_uri.unwrap_or_else(|| {
            format!(
                "https://scryfall.com/search?q={}",
                urlencoding::encode(&format!("!\"{}\"", request.name))
            )
        });

        ResolvedCard {
            game: Game::Magic,
            name,
            set_name: card.set_name.unwrap_or_else(|| UNKNOWN_SET.to_string()),
            unit_price,
            image_url,
            detail_uri,
        }
    }
}

#[async_trait]
impl<A: ScryfallApi> CardResolver for MagicResolver<A> {
    fn game(&self) -> Game {
        Game::Magic
    }

    fn name(&self) -> &str {
        CATALOG_NAME
    }

    async fn resolve(&self, request: &CardRequest) -> Option<ResolvedCard> {
        for (tier, query) in query_plan(request).into_iter().enumerate() {
            let result = match &query {
                ScryfallQuery::Search(q) => self.api.search(q).await.map(|cards| cards.into_iter().next()),
                ScryfallQuery::Fuzzy(name) => self.api.named_fuzzy(name).await.map(Some),
            };

            match result {
                Ok(Some(card)) => {
                    debug!(tier = tier + 1, query = ?query, "Scryfall match");
                    return Some(Self::to_resolved(card, request));
                }
                Ok(None) | Err(CatalogError::NotFound) => {
                    debug!(tier = tier + 1, query = ?query, "No Scryfall results, trying next tier");
                }
                Err(e) => {
                    warn!(tier = tier + 1, query = ?query, error = %e, "Scryfall query failed, trying next tier");
                }
            }
        }

        info!(line = %request.raw_line, "No Scryfall match after all tiers");
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
