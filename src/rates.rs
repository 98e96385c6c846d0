//! Exchange rate refresh with fallback service and on-disk cache

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::FetchError;
use crate::events::{EventBus, WalletEvent};

const RATES_CACHE_FILE: &str = "rates.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub code: String,
    pub name: String,
    pub rate: f64,
}

/// Parse a rates body. `None` if the body is not a JSON array; entries that
/// are not rates are skipped.
pub fn parse_rates(body: &[u8]) -> Option<Vec<Rate>> {
    let entries: Vec<serde_json::Value> = serde_json::from_slice(body).ok()?;
    Some(
        entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<Rate>(entry).ok())
            .collect(),
    )
}

pub struct RateUpdater {
    client: reqwest::Client,
    url: String,
    fallback_url: String,
    cache_path: PathBuf,
    events: EventBus,
    rates: RwLock<Vec<Rate>>,
}

impl RateUpdater {
    pub fn new(
        url: impl Into<String>,
        fallback_url: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        events: EventBus,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            fallback_url: fallback_url.into(),
            cache_path: cache_dir.into().join(RATES_CACHE_FILE),
            events,
            rates: RwLock::new(Vec::new()),
        }
    }

    pub fn current(&self) -> Vec<Rate> {
        self.rates.read().clone()
    }

    pub fn rate_for(&self, code: &str) -> Option<Rate> {
        self.rates.read().iter().find(|r| r.code == code).cloned()
    }

    /// Fetch rates from the primary service, the cache, then the fallback
    /// service, in that order.
    pub async fn refresh(&self) -> Result<Vec<Rate>, FetchError> {
        let primary = match self.fetch(&self.url).await {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("Rates fetch failed ({}), trying cached rates", e);
                self.load_cache()
            }
        };
        if let Some(rates) = primary.as_deref().and_then(|body| self.accept(body)) {
            return Ok(rates);
        }

        log::info!("Primary rates unusable, trying fallback {}", self.fallback_url);
        let body = self.fetch(&self.fallback_url).await?;
        self.accept(&body).ok_or_else(|| {
            FetchError::InvalidResponse("rates fallback didn't return an array".to_string())
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Parse, cache and publish a body; `None` if it isn't a rates array
    fn accept(&self, body: &[u8]) -> Option<Vec<Rate>> {
        let rates = parse_rates(body)?;
        if let Err(e) = self.store_cache(body) {
            log::warn!("Could not cache rates: {}", e);
        }
        *self.rates.write() = rates.clone();
        self.events
            .publish(WalletEvent::RatesUpdated { count: rates.len() });
        Some(rates)
    }

    fn load_cache(&self) -> Option<Vec<u8>> {
        match fs::read(&self.cache_path) {
            Ok(body) => Some(body),
            Err(e) => {
                log::debug!("No cached rates at {:?}: {}", self.cache_path, e);
                None
            }
        }
    }

    fn store_cache(&self, body: &[u8]) -> Result<(), std::io::Error> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.cache_path, body)
    }
}
