//! Application configuration loading and validation.
//!
//! Configuration is a TOML file. Every section is optional and falls back to
//! the defaults below; `RUST_LOG` overrides the configured log level.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{AtrBounds, ProfileTable, Session, VolatilityProfile, DEFAULT_ATR_LOOKBACK};
use crate::error::{ConfigError, Result};
use crate::exchange::{Timeframe, DEFAULT_API_URL};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Kill zone hours, UTC.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
}

const fn default_start_hour() -> u32 {
    14
}

const fn default_end_hour() -> u32 {
    18
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
        }
    }
}

impl From<&SessionConfig> for Session {
    fn from(config: &SessionConfig) -> Self {
        Session::new(config.start_hour, config.end_hour)
    }
}

/// Signal, gating and sizing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub timeframe: Timeframe,
    /// Candles requested per symbol per cycle.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,
    #[serde(default = "default_atr_lookback")]
    pub atr_lookback: usize,
    #[serde(default = "default_min_atr")]
    pub min_atr: Decimal,
    #[serde(default = "default_max_atr")]
    pub max_atr: Decimal,
    /// Bias threshold as a fraction of ATR.
    #[serde(default = "default_threshold_multiplier")]
    pub threshold_multiplier: Decimal,
    /// Quote amount committed per position.
    #[serde(default = "default_notional")]
    pub notional_per_trade: Decimal,
    /// Minimum in-window coherence to open. Unset disables the gate.
    #[serde(default)]
    pub min_coherence: Option<Decimal>,
}

fn default_symbols() -> Vec<String> {
    [
        "BTC/USD", "ADA/USD", "XRP/USD", "SOL/USD", "ETH/USD", "LTC/USD", "DOT/USD", "BCH/USD",
        "UNI/USD", "LINK/USD",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

const fn default_candle_limit() -> usize {
    50
}

const fn default_atr_lookback() -> usize {
    DEFAULT_ATR_LOOKBACK
}

fn default_min_atr() -> Decimal {
    dec!(0.05)
}

fn default_max_atr() -> Decimal {
    dec!(100)
}

fn default_threshold_multiplier() -> Decimal {
    dec!(0.05)
}

fn default_notional() -> Decimal {
    dec!(100)
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            timeframe: Timeframe::default(),
            candle_limit: default_candle_limit(),
            atr_lookback: default_atr_lookback(),
            min_atr: default_min_atr(),
            max_atr: default_max_atr(),
            threshold_multiplier: default_threshold_multiplier(),
            notional_per_trade: default_notional(),
            min_coherence: None,
        }
    }
}

impl StrategyConfig {
    #[must_use]
    pub fn atr_bounds(&self) -> AtrBounds {
        AtrBounds {
            min: self.min_atr,
            max: self.max_atr,
        }
    }
}

/// Volatility profiles: a default plus per-symbol overrides.
///
/// ```toml
/// [risk.default_profile]
/// stop_multiplier = 1.5
/// target_multiplier = 3.0
///
/// [risk.profiles."SOL/USD"]
/// stop_multiplier = 2.0
/// target_multiplier = 4.0
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub default_profile: VolatilityProfile,
    #[serde(default)]
    pub profiles: HashMap<String, VolatilityProfile>,
}

impl From<&RiskConfig> for ProfileTable {
    fn from(config: &RiskConfig) -> Self {
        ProfileTable {
            fallback: config.default_profile,
            symbols: config.profiles.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Per-request timeout for candle and price fetches.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

const fn default_tick_interval_secs() -> u64 {
    60
}

const fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_positions_file")]
    pub positions_file: PathBuf,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_positions_file() -> PathBuf {
    PathBuf::from("open_positions.json")
}

const fn default_debounce_ms() -> u64 {
    1000
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            positions_file: default_positions_file(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl PersistenceConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Starting balance for the drawdown audit.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,
}

fn default_initial_capital() -> Decimal {
    dec!(500)
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        let session = &self.session;
        if session.start_hour >= session.end_hour || session.end_hour > 24 {
            return Err(invalid(
                "session",
                format!(
                    "need start_hour < end_hour <= 24, got {}..{}",
                    session.start_hour, session.end_hour
                ),
            )
            .into());
        }

        let strategy = &self.strategy;
        if strategy.symbols.is_empty() {
            return Err(ConfigError::MissingField { field: "symbols" }.into());
        }
        if strategy.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("symbols", "empty symbol").into());
        }
        if strategy.candle_limit == 0 {
            return Err(invalid("candle_limit", "must be positive").into());
        }
        if strategy.atr_lookback == 0 {
            return Err(invalid("atr_lookback", "must be positive").into());
        }
        if strategy.min_atr < Decimal::ZERO || strategy.min_atr >= strategy.max_atr {
            return Err(invalid(
                "min_atr",
                format!("need 0 <= min_atr < max_atr, got {} / {}", strategy.min_atr, strategy.max_atr),
            )
            .into());
        }
        if strategy.threshold_multiplier < Decimal::ZERO {
            return Err(invalid("threshold_multiplier", "must not be negative").into());
        }
        if strategy.notional_per_trade <= Decimal::ZERO {
            return Err(invalid("notional_per_trade", "must be positive").into());
        }

        let profiles = std::iter::once(("default", &self.risk.default_profile))
            .chain(self.risk.profiles.iter().map(|(k, v)| (k.as_str(), v)));
        for (symbol, profile) in profiles {
            if profile.stop_multiplier <= Decimal::ZERO || profile.target_multiplier <= Decimal::ZERO {
                return Err(invalid("risk", format!("profile '{symbol}' multipliers must be positive")).into());
            }
        }

        if self.scheduler.tick_interval_secs == 0 {
            return Err(invalid("tick_interval_secs", "must be positive").into());
        }
        if self.scheduler.fetch_timeout_secs == 0 {
            return Err(invalid("fetch_timeout_secs", "must be positive").into());
        }
        if self.persistence.positions_file.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "positions_file",
            }
            .into());
        }
        if self.feed.api_url.is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}
