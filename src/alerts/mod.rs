//! Value-change notifications.
//!
//! Defines the `Notifier` trait and a webhook implementation that posts a
//! short text message (Discord/Slack-style `{"content": ...}` payload).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use tracing::{debug, info};

const NOTIFIER_NAME: &str = "webhook";

// ---------------------------------------------------------------------------
// Alert payload
// ---------------------------------------------------------------------------

/// A day-over-day change in collection value worth telling someone about.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueAlert {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub previous_date: NaiveDate,
    pub previous_value: Decimal,
    pub change_pct: Decimal,
}

impl ValueAlert {
    /// Human-readable message body.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ValueAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.change_pct.is_sign_negative() { "" } else { "+" };
        write!(
            f,
            "Collection value is ${:.2} on {} ({sign}{:.2}% since {}, was ${:.2})",
            self.total_value.round_dp(2),
            self.date.format("%Y-%m-%d"),
            self.change_pct.round_dp(2),
            self.previous_date.format("%Y-%m-%d"),
            self.previous_value.round_dp(2),
        )
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Abstraction over outbound notification targets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert.
    async fn notify(&self, alert: &ValueAlert) -> Result<()>;

    /// Target name for logging.
    fn name(&self) -> &'static str;
}

/// Incoming-webhook notifier.
pub struct WebhookNotifier {
    http: Client,
    url: Secret<String>,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client for webhook")?;

        Ok(Self { http, url: Secret::new(url) })
    }

    /// Build a notifier from the env var named in config. Returns `None`
    /// when no variable is configured or it is unset or blank.
    pub fn from_env(env_name: Option<&str>) -> Result<Option<Self>> {
        let url = env_name
            .and_then(|name| std::env::var(name).ok())
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        match url {
            Some(url) => Ok(Some(Self::new(url)?)),
            None => {
                debug!(env = ?env_name, "No webhook URL configured, alerts disabled");
                Ok(None)
            }
        }
    }

    fn payload(alert: &ValueAlert) -> serde_json::Value {
        serde_json::json!({ "content": alert.message() })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, alert: &ValueAlert) -> Result<()> {
        let resp = self
            .http
            .post(self.url.expose_secret())
            .json(&Self::payload(alert))
            .send()
            .await
            .context("Webhook request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Webhook rejected alert {status}: {body}");
        }

        info!(change_pct = %alert.change_pct.round_dp(2), "Value alert sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        NOTIFIER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
