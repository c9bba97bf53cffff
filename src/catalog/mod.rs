//! Card catalog integrations.
//!
//! Defines the `CardResolver` trait and provides one implementation per game:
//! - Scryfall for Magic: The Gathering
//! - YGOPRODeck for Yu-Gi-Oh!
//!
//! Resolvers run a tiered query cascade and never fail outward: a request
//! that no tier can match resolves to `None` and the caller skips it.

pub mod scryfall;
pub mod ygoprodeck;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::types::{CardRequest, Game, ResolvedCard};

/// HTTP timeout for catalog requests.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Abstraction over per-game card catalogs.
#[async_trait]
pub trait CardResolver: Send + Sync {
    /// The game this resolver prices.
    fn game(&self) -> Game;

    /// Catalog name for logging.
    fn name(&self) -> &str;

    /// Match a request to a single catalog entry, or `None` once every
    /// query tier has come back empty or failed.
    async fn resolve(&self, request: &CardRequest) -> Option<ResolvedCard>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single catalog query. Always recoverable by the cascade.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("No matching card")]
    NotFound,

    #[error("Client error {status}: {body}")]
    Client { status: u16, body: String },

    #[error("Server error {status}")]
    Server { status: u16 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse catalog response: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Build the HTTP client shared by a catalog integration.
pub(crate) fn build_http_client(user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

/// GET a URL and decode its JSON body, mapping HTTP status classes onto
/// `CatalogError`.
pub(crate) async fn get_json<T: DeserializeOwned>(http: &Client, url: &str) -> Result<T, CatalogError> {
    debug!(url, "Catalog request");

    let resp = http
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(CatalogError::NotFound);
    }
    if status.is_client_error() {
        let body = resp.text().await.unwrap_or_default();
        return Err(CatalogError::Client { status: status.as_u16(), body });
    }
    if !status.is_success() {
        return Err(CatalogError::Server { status: status.as_u16() });
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| CatalogError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Throttle
// ---------------------------------------------------------------------------

/// Fixed minimum spacing between successive resolver calls.
///
/// Shared across every game in a run so the combined request rate stays
/// polite. No backoff: the delay never grows.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep until `delay` has passed since the previous call. The first
    /// call returns immediately.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
