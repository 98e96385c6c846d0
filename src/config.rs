//! Bootstrap configuration from environment variables
//!
//! Controls where chain state is kept and which services are queried
//! for the start block, fee levels and exchange rates.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::DEFAULT_ADDRESS_LIMIT;

const DEFAULT_INDEX_URL: &str = "http://localhost:3000";
const DEFAULT_FEE_URL: &str = "https://go.digibyte.co/bws/api/v2/feelevels/";
const DEFAULT_RATES_URL: &str = "https://digibyte.io/rates.php";
const DEFAULT_RATES_FALLBACK_URL: &str = "http://pettys.website/rates.php";

/// Matches the background-fetch budget of the host application
pub const DEFAULT_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    /// Directory holding checkpoint, block log, preferences and rate cache
    pub data_dir: PathBuf,
    /// Base URL of the earliest-block index service
    pub index_url: String,
    /// Upper bound for one start-block resolution
    pub resolution_timeout: Duration,
    /// Maximum number of wallet addresses sent to the index
    pub address_limit: usize,
    pub fee_url: String,
    pub rates_url: String,
    pub rates_fallback_url: String,
    pub fee_refresh_interval: Duration,
    /// Budget for one background fetch of fees and rates
    pub background_fetch_budget: Duration,
}

impl BootstrapConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DGB_DATA_DIR`: chain state directory (default `./dgb-data`)
    /// - `DGB_INDEX_URL`: earliest-block index endpoint
    /// - `DGB_RESOLUTION_TIMEOUT_SECS`: resolution timeout (default 25)
    /// - `DGB_ADDRESS_LIMIT`: addresses per index request (default 20)
    /// - `DGB_FEE_URL`, `DGB_RATES_URL`, `DGB_RATES_FALLBACK_URL`: data fetchers
    /// - `DGB_FEE_REFRESH_SECS`: fee refresh interval (default 15)
    /// - `DGB_BACKGROUND_FETCH_SECS`: background fetch budget (default 25)
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Local development against the index mock
    /// DGB_INDEX_URL=http://localhost:3000 cargo run -- D8Y...
    /// ```
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let data_dir = env::var("DGB_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        log::info!("Data directory: {:?}", data_dir);

        let index_url = env::var("DGB_INDEX_URL").unwrap_or(defaults.index_url);
        log::info!("Index URL: {}", index_url);

        let resolution_timeout = secs_from_env(
            "DGB_RESOLUTION_TIMEOUT_SECS",
            defaults.resolution_timeout,
        );

        let address_limit = match env::var("DGB_ADDRESS_LIMIT") {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    log::warn!(
                        "Invalid DGB_ADDRESS_LIMIT '{}', using {}",
                        raw,
                        defaults.address_limit
                    );
                    defaults.address_limit
                }
            },
            Err(_) => defaults.address_limit,
        };

        Self {
            data_dir,
            index_url,
            resolution_timeout,
            address_limit,
            fee_url: env::var("DGB_FEE_URL").unwrap_or(defaults.fee_url),
            rates_url: env::var("DGB_RATES_URL").unwrap_or(defaults.rates_url),
            rates_fallback_url: env::var("DGB_RATES_FALLBACK_URL")
                .unwrap_or(defaults.rates_fallback_url),
            fee_refresh_interval: secs_from_env(
                "DGB_FEE_REFRESH_SECS",
                defaults.fee_refresh_interval,
            ),
            background_fetch_budget: secs_from_env(
                "DGB_BACKGROUND_FETCH_SECS",
                defaults.background_fetch_budget,
            ),
        }
    }

    /// Point every service URL at one base (index mock, tests)
    pub fn with_service_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.index_url = base.to_string();
        self.fee_url = format!("{}/fee-levels", base);
        self.rates_url = format!("{}/rates", base);
        self.rates_fallback_url = format!("{}/rates-fallback", base);
        self
    }
}

fn secs_from_env(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                log::warn!("Invalid {} '{}', using {:?}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./dgb-data"),
            index_url: DEFAULT_INDEX_URL.to_string(),
            resolution_timeout: DEFAULT_RESOLUTION_TIMEOUT,
            address_limit: DEFAULT_ADDRESS_LIMIT,
            fee_url: DEFAULT_FEE_URL.to_string(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            rates_fallback_url: DEFAULT_RATES_FALLBACK_URL.to_string(),
            fee_refresh_interval: Duration::from_secs(15),
            background_fetch_budget: Duration::from_secs(25),
        }
    }
}
