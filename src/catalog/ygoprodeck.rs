//! YGOPRODeck integration for Yu-Gi-Oh!
//!
//! API docs: https://ygoprodeck.com/api-guide/
//! Endpoint: https://db.ygoprodeck.com/api/v7/cardinfo.php
//! Rate limit: 20 requests/second, exceeding it blocks the IP for an hour.
//! Auth: none.
//!
//! `?name=` is an exact match and answers 400 when nothing matches;
//! `?fname=` is a partial-name search.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{build_http_client, get_json, CardResolver, CatalogError};
use crate::types::{CardRequest, Game, Price, ResolvedCard};

const BASE_URL: &str = "https://db.ygoprodeck.com/api/v7/cardinfo.php";
const CATALOG_NAME: &str = "ygoprodeck";
const DEFAULT_SET_NAME: &str = "Unknown Set";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct YgoResponse {
    #[serde(default)]
    data: Vec<YgoCard>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YgoCard {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub card_sets: Vec<YgoSet>,
    #[serde(default)]
    pub card_images: Vec<YgoImage>,
    #[serde(default)]
    pub card_prices: Vec<YgoPrices>,
    #[serde(default)]
    pub ygoprodeck_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YgoSet {
    #[serde(default)]
    pub set_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YgoImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Marketplace prices, all reported as strings (`"0.25"`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YgoPrices {
    #[serde(default)]
    pub tcgplayer_price: Option<String>,
}

// ---------------------------------------------------------------------------
// API seam
// ---------------------------------------------------------------------------

/// How to look a card up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YgoLookup {
    Exact(String),
    Fuzzy(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait YgoApi: Send + Sync {
    async fn card_info(&self, lookup: &YgoLookup) -> Result<Vec<YgoCard>, CatalogError>;
}

/// reqwest-backed YGOPRODeck client.
pub struct YgoProDeckClient {
    http: Client,
    base_url: String,
}

impl YgoProDeckClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        Ok(Self {
            http: build_http_client(user_agent)?,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl YgoApi for YgoProDeckClient {
    async fn card_info(&self, lookup: &YgoLookup) -> Result<Vec<YgoCard>, CatalogError> {
        let (param, value) = match lookup {
            YgoLookup::Exact(name) => ("name", name),
            YgoLookup::Fuzzy(name) => ("fname", name),
        };
        let url = format!("{}?{param}={}", self.base_url, urlencoding::encode(value));
        let resp: YgoResponse = get_json(&self.http, &url).await?;
        Ok(resp.data)
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub struct YuGiOhResolver<A: YgoApi = YgoProDeckClient> {
    api: A,
}

impl YuGiOhResolver<YgoProDeckClient> {
    pub fn from_user_agent(user_agent: &str) -> Result<Self> {
        Ok(Self::new(YgoProDeckClient::new(user_agent)?))
    }
}

impl<A: YgoApi> YuGiOhResolver<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    fn to_resolved(card: YgoCard, request: &CardRequest) -> ResolvedCard {
        let unit_price = Price::parse(
            card.card_prices
                .first()
                .and_then(|p| p.tcgplayer_price.as_deref()),
        );

        let set_name = card
            .card_sets
            .first()
            .map(|s| s.set_name.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SET_NAME.to_string());

        let image_url = card.card_images.into_iter().next().and_then(|i| i.image_url);

        let name = if card.name.is_empty() {
            request.name.clone()
        } else {
            card.name
        };

        let detail_uri = card.ygoprodeck_url.unwrap_or_else(|| {
            format!("https://ygoprodeck.com/card/?search={}", urlencoding::encode(&name))
        });

        ResolvedCard {
            game: Game::YuGiOh,
            name,
            set_name,
            unit_price,
            image_url,
            detail_uri,
        }
    }

    async fn first_match(&self, lookup: YgoLookup) -> Option<YgoCard> {
        match self.api.card_info(&lookup).await {
            Ok(cards) => {
                if cards.is_empty() {
                    debug!(lookup = ?lookup, "YGOPRODeck returned no cards");
                }
                cards.into_iter().next()
            }
            Err(CatalogError::Client { status, .. }) => {
                debug!(lookup = ?lookup, status, "No YGOPRODeck match");
                None
            }
            Err(CatalogError::NotFound) => None,
            Err(e) => {
                warn!(lookup = ?lookup, error = %e, "YGOPRODeck query failed");
                None
            }
        }
    }
}

#[async_trait]
impl<A: YgoApi> CardResolver for YuGiOhResolver<A> {
    fn game(&self) -> Game {
        Game::YuGiOh
    }

    fn name(&self) -> &str {
        CATALOG_NAME
    }

    async fn resolve(&self, request: &CardRequest) -> Option<ResolvedCard> {
        let tiers = [
            YgoLookup::Exact(request.name.clone()),
            YgoLookup::Fuzzy(request.name.clone()),
        ];

        for lookup in tiers {
            if let Some(card) = self.first_match(lookup).await {
                return Some(Self::to_resolved(card, request));
            }
        }

        info!(line = %request.raw_line, "No YGOPRODeck match after all tiers");
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
