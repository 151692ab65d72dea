//! Sensing surface
//!
//! The game UI is observed through a sidecar bridge that drives the
//! headless browser: it intercepts state-feed responses (without ever
//! blocking them from reaching the page) and answers one JSON
//! observation per poll with the page text blob, the visibility of
//! the three interaction controls, and the latest feed payload.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::phase::UiSignals;

/// Default sensor bridge URL
const DEFAULT_SENSOR_URL: &str = "http://localhost:9222";

/// Per-observation request timeout
const OBSERVE_TIMEOUT: Duration = Duration::from_secs(10);

/// One observation of the sensing surface
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub ui: UiSignals,
    /// Latest intercepted state-feed payload, if any arrived since
    /// the last poll
    pub feed: Option<serde_json::Value>,
}

/// The sensing seam; tests script observations through it
pub trait Sensor: Send {
    fn observe(
        &mut self,
    ) -> impl std::future::Future<Output = anyhow::Result<Observation>> + Send;
}

/// Wire shape of a bridge observation
#[derive(Debug, Deserialize)]
struct BridgeObservation {
    #[serde(default)]
    body_text: String,
    #[serde(default)]
    has_attack: bool,
    #[serde(default)]
    has_flee: bool,
    #[serde(default)]
    has_explore: bool,
    #[serde(default)]
    feed: Option<serde_json::Value>,
}

/// HTTP client for the sensor bridge sidecar
pub struct BridgeSensor {
    base_url: String,
    http_client: Client,
}

impl BridgeSensor {
    /// Reads `SENSOR_URL` from the environment, defaulting to the
    /// local bridge
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url =
            std::env::var("SENSOR_URL").unwrap_or_else(|_| DEFAULT_SENSOR_URL.to_string());
        Self::with_url(base_url)
    }

    /// Create with a specific URL (for testing)
    pub fn with_url(base_url: String) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(OBSERVE_TIMEOUT)
            .pool_max_idle_per_host(2)
            .build()?;
        info!(url = %base_url, "sensor bridge client initialized");
        Ok(Self {
            base_url,
            http_client,
        })
    }
}

impl Sensor for BridgeSensor {
    async fn observe(&mut self) -> anyhow::Result<Observation> {
        let url = format!("{}/observe", self.base_url);
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("sensor bridge returned status {}", response.status());
        }

        let raw: BridgeObservation = response.json().await?;
        debug!(
            has_attack = raw.has_attack,
            has_flee = raw.has_flee,
            has_explore = raw.has_explore,
            has_feed = raw.feed.is_some(),
            "sensor observation"
        );

        Ok(Observation {
            ui: UiSignals {
                body_text: raw.body_text,
                has_attack: raw.has_attack,
                has_flee: raw.has_flee,
                has_explore: raw.has_explore,
            },
            feed: raw.feed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_observation_tolerates_missing_fields() {
        let raw: BridgeObservation = serde_json::from_str("{}").unwrap();
        assert_eq!(raw.body_text, "");
        assert!(!raw.has_attack);
        assert!(raw.feed.is_none());
    }

    #[test]
    fn test_bridge_observation_full() {
        let raw: BridgeObservation = serde_json::from_str(
            r#"{"body_text":"Ambushed!","has_attack":true,"has_flee":true,"has_explore":false,"feed":{"data":{}}}"#,
        )
        .unwrap();
        assert!(raw.has_attack);
        assert!(raw.feed.is_some());
    }
}
