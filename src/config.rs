//! Typed, immutable configuration loaded from JSON at startup.
//!
//! The original system reads every parameter by string key from nested
//! dictionaries (design note in SPEC_FULL.md §9/§11). Here each process
//! loads a typed struct once via `load_from_file`, and the hedger polls a
//! `ConfigStore` for a version bump on the cadence described in §4.E.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::models::{BizType, PositionSide, TimeInForce};

fn load_from_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// `near_side` / `far_side`: which side(s) of the ladder a pass maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SideSelect {
    Both,
    Ask,
    Bid,
}

impl SideSelect {
    pub fn wants_ask(self) -> bool {
        matches!(self, SideSelect::Both | SideSelect::Ask)
    }

    pub fn wants_bid(self) -> bool {
        matches!(self, SideSelect::Both | SideSelect::Bid)
    }
}

/// Far-liquidity generation strategy. Only `Spread` is implemented (§4.D.6);
/// any other value yields no far orders, matching `_gen_ask_orders_far`'s
/// fallback to an empty list for unrecognised strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarStrategy {
    Spread,
    #[serde(other)]
    Unsupported,
}

/// Per-symbol market-making configuration (§6 "MM").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MmTokenConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub passphrase: String,

    pub maker_exchange: String,
    pub maker_symbol: String,
    pub follow_exchange: String,
    pub follow_symbol: String,

    pub price_decimals: u32,
    pub qty_decimals: u32,
    pub term_type: BizType,
    #[serde(default)]
    pub position_side: PositionSide,

    pub near_side: SideSelect,
    pub near_ask_size: usize,
    pub near_bid_size: usize,
    pub near_qty_multiplier: f64,
    pub near_sell_price_margin: f64,
    pub near_buy_price_margin: f64,
    pub near_max_amt_per_order: f64,
    pub near_interval: f64,
    pub near_tif: TimeInForce,
    pub near_diff_rate_per_round: f64,
    pub force_refresh_num: u32,

    #[serde(default)]
    pub far_side: Option<SideSelect>,
    #[serde(default)]
    pub far_ask_size: usize,
    #[serde(default)]
    pub far_bid_size: usize,
    #[serde(default)]
    pub far_qty_multiplier: f64,
    #[serde(default)]
    pub far_sell_price_margin: f64,
    #[serde(default)]
    pub far_buy_price_margin: f64,
    #[serde(default)]
    pub far_max_amt_per_order: f64,
    #[serde(default)]
    pub far_strategy: Option<FarStrategy>,
    #[serde(default)]
    pub far_interval: Option<f64>,
    #[serde(default)]
    pub far_tif: Option<TimeInForce>,
}

impl MmTokenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingField("api_key"));
        }
        if self.api_secret.is_empty() {
            return Err(ConfigError::MissingField("api_secret"));
        }
        Ok(())
    }
}

pub fn load_mm_configs(path: &Path) -> Result<Vec<MmTokenConfig>, ConfigError> {
    let configs: Vec<MmTokenConfig> = load_from_file(path)?;
    for c in &configs {
        c.validate()?;
    }
    Ok(configs)
}

/// Hedger configuration (§6 "Hedger"). One hedger process hedges one maker
/// symbol onto one hedge venue/symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgerConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub passphrase: String,

    pub maker_symbol: String,
    pub hedge_symbol: String,
    pub hedge_exchange: String,

    pub price_decimals: u32,
    pub qty_decimals: u32,
    pub min_qty_per_order: f64,
    pub min_amt_per_order: f64,
    pub slippage: f64,

    /// Base URL for the private fill-stream WS (BiFu shape, §6); joined with
    /// `/api/v1/private/ws` by `hedger::private_ws`.
    #[serde(default)]
    pub private_ws_url: String,

    #[serde(default)]
    pub version: u64,
}

impl HedgerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(ConfigError::MissingField("api_key/api_secret"));
        }
        Ok(())
    }

    pub fn store_key(&self) -> String {
        format!("{}_{}@{}", self.maker_symbol, self.hedge_symbol, self.hedge_exchange)
    }
}

pub fn load_hedger_config(path: &Path) -> Result<HedgerConfig, ConfigError> {
    let config: HedgerConfig = load_from_file(path)?;
    config.validate()?;
    Ok(config)
}

/// Self-trader configuration (§6 "ST").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTraderConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub passphrase: String,

    pub follow_exchange: String,
    pub follow_symbol: String,
    pub maker_symbol: String,
    pub term_type: BizType,

    pub price_decimals: u32,
    pub qty_decimals: u32,

    pub interval: f64,
    #[serde(default)]
    pub quote_timeout: f64,
    pub qty_multiplier: f64,
    pub max_amt_per_order: f64,
    pub min_qty_per_order: f64,
    pub min_amt_per_order: f64,
    pub price_divergence: f64,
}

impl SelfTraderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(ConfigError::MissingField("api_key/api_secret"));
        }
        Ok(())
    }
}

pub fn load_selftrader_configs(path: &Path) -> Result<Vec<SelfTraderConfig>, ConfigError> {
    let configs: Vec<SelfTraderConfig> = load_from_file(path)?;
    for c in &configs {
        c.validate()?;
    }
    Ok(configs)
}

/// Symbol list for one quote-ingester process (§6 Public WS interfaces).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub depth_symbols: Vec<String>,
    #[serde(default)]
    pub ticker_symbols: Vec<String>,
}

pub fn load_ingest_config(path: &Path) -> Result<IngestConfig, ConfigError> {
    load_from_file(path)
}

/// Polling seam for config hot-reload (§4.E housekeeping: 1s cadence,
/// reinit WS clients on version bump). The in-memory default never reports
/// a new version; a KV-backed implementation plugs in behind the same trait.
pub trait ConfigStore: Send + Sync {
    fn poll(&self, key: &str, current_version: u64) -> Option<(u64, serde_json::Value)>;
}

#[derive(Debug, Default)]
pub struct NoopConfigStore;

impl ConfigStore for NoopConfigStore {
    fn poll(&self, _key: &str, _current_version: u64) -> Option<(u64, serde_json::Value)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_mm_config_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "api_key": "k", "api_secret": "s",
                "maker_exchange": "binance_spot", "maker_symbol": "BTCUSDT",
                "follow_exchange": "binance_spot", "follow_symbol": "btcusdt",
                "price_decimals": 2, "qty_decimals": 5, "term_type": "SPOT",
                "near_side": "BOTH", "near_ask_size": 5, "near_bid_size": 5,
                "near_qty_multiplier": 1.0, "near_sell_price_margin": 1.0,
                "near_buy_price_margin": 1.0, "near_max_amt_per_order": 1000.0,
                "near_interval": 1.0, "near_tif": "Gtc", "near_diff_rate_per_round": 5.0,
                "force_refresh_num": 20
            }}]"#
        )
        .unwrap();

        let configs = load_mm_configs(file.path()).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].maker_symbol, "BTCUSDT");
        assert!(configs[0].far_side.is_none());
    }

    #[test]
    fn rejects_missing_api_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "api_key": "", "api_secret": "s",
                "maker_symbol": "BTCUSDT", "hedge_symbol": "BTCUSDT", "hedge_exchange": "okx_spot",
                "price_decimals": 2, "qty_decimals": 5,
                "min_qty_per_order": 0.001, "min_amt_per_order": 10.0, "slippage": 3.0
            }}"#
        )
        .unwrap();

        let err = load_hedger_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }
}
