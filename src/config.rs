//! Configuration loading
//!
//! Settings come from an optional TOML file layered with environment
//! variables. Exchange credentials are only ever read from the
//! environment (or a `.env` file via dotenvy), never from source or
//! committed config.

use crate::error::{BotError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub weex: WeexConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from `path` (optional) plus environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("WEEX_BOT").separator("__"));

        let mut cfg: Config = builder
            .build()
            .map_err(|e| BotError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| BotError::Config(e.to_string()))?;

        // Credential env vars always win over file values
        if let Ok(v) = std::env::var("WEEX_API_KEY") {
            cfg.weex.api_key = v;
        }
        if let Ok(v) = std::env::var("WEEX_API_SECRET") {
            cfg.weex.api_secret = v;
        }
        if let Ok(v) = std::env::var("WEEX_API_PASSPHRASE") {
            cfg.weex.api_passphrase = v;
        }
        if let Ok(v) = std::env::var("WEEX_UID") {
            cfg.weex.uid = v;
        }

        Ok(cfg)
    }
}

/// Dashboard HTTP/WebSocket server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
        }
    }
}

/// WEEX contract API access
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeexConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
    /// Competition UID, informational only
    pub uid: String,
}

impl WeexConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty() && !self.api_passphrase.is_empty()
    }
}

impl Default for WeexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-contract.weex.com".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            api_passphrase: String::new(),
            uid: String::new(),
        }
    }
}

/// Price polling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Pairs to poll, exchange-neutral form (BTCUSDT)
    pub symbols: Vec<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_ms: u64,
    /// Capacity of the per-symbol recent-price buffer
    pub max_history: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "SOLUSDT".to_string(),
                "ADAUSDT".to_string(),
            ],
            poll_interval_secs: 2,
            request_timeout_ms: 2000,
            max_history: 120,
        }
    }
}

/// Momentum heuristic parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub short_window: usize,
    pub long_window: usize,
    /// Buy when short/long ratio exceeds 1 + this many percent
    pub buy_threshold_pct: Decimal,
    /// Sell when short/long ratio drops below 1 - this many percent
    pub sell_threshold_pct: Decimal,
    /// Notional per entry, USD
    pub trade_size_usd: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 20,
            buy_threshold_pct: dec!(0.3),
            sell_threshold_pct: dec!(0.3),
            trade_size_usd: dec!(50),
            take_profit_pct: dec!(5.0),
            stop_loss_pct: dec!(3.0),
        }
    }
}

/// Hard limits checked before every entry
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Max fraction of portfolio per position
    pub max_position_pct: Decimal,
    /// Max fraction of portfolio in open positions
    pub max_exposure_pct: Decimal,
    /// Stop entering once drawdown from the high-water mark hits this
    pub max_drawdown_pct: Decimal,
    /// Competition rule: leverage cap
    pub max_leverage: u32,
    /// Seconds between entries on the same symbol
    pub cooldown_secs: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_pct: dec!(0.05),
            max_exposure_pct: dec!(0.50),
            max_drawdown_pct: dec!(0.10),
            max_leverage: 5,
            cooldown_secs: 60,
        }
    }
}

/// Simulated wallet
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub initial_balance: Decimal,
    pub slippage_pct: Decimal,
    pub fee_pct: Decimal,
    /// Auto-saved wallet state, None disables persistence
    pub state_file: Option<String>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(1000),
            slippage_pct: dec!(0.25),
            fee_pct: dec!(0.1),
            state_file: Some("paper_state.json".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/trades.db".to_string(),
        }
    }
}
