//! Layered engine configuration

use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::{Error, Result};

/// Main configuration struct
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Network configuration (wallet, mainnet switch)
    pub network: NetworkSettings,
    /// Grid geometry and cadence
    pub grid: GridSettings,
    /// Risk guard thresholds
    pub risk: RiskSettings,
    /// Status endpoint binding
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging configuration
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSettings {
    /// Wallet private key (hex string)
    /// In production, prefer loading this from ENV variables only
    pub private_key: String,
    /// Account address queried for state. Empty means "derive from the key".
    #[serde(default)]
    pub wallet_address: String,
    /// Trade real funds on mainnet instead of testnet
    #[serde(default)]
    pub mainnet: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSettings {
    /// Coin to trade (e.g. "BTC")
    pub symbol: String,
    /// Optional override for the asset index; the exchange meta wins when
    /// they disagree
    #[serde(default)]
    pub asset_index: Option<u32>,
    /// Number of rungs in the ladder
    pub grid_levels: u32,
    /// Multiplicative spacing between adjacent rungs, in percent
    pub grid_spacing_percent: Decimal,
    /// Constant per-rung order quantity
    pub order_size_btc: Decimal,
    /// Seconds between sync cycles
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

impl GridSettings {
    /// Spacing as a fraction (1% -> 0.01)
    pub fn spacing_fraction(&self) -> Decimal {
        self.grid_spacing_percent / Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskSettings {
    /// Net position cap; exceeding it rebuilds the grid
    pub max_position_size_btc: Decimal,
    /// Drawdown from peak equity, in percent, that halts trading
    pub max_drawdown_percent: Decimal,
    /// Lowest mid price the grid is allowed to trade at (inclusive)
    pub min_grid_price: Decimal,
    /// Highest mid price the grid is allowed to trade at (inclusive)
    pub max_grid_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_sync_interval() -> u64 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> std::result::Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(config_path))
            // Environment variables override the file,
            // e.g. HYPERGRID_NETWORK__PRIVATE_KEY=...
            .add_source(config::Environment::with_prefix("HYPERGRID").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Fail fast on configurations the engine cannot trade
    pub fn validate(&self) -> Result<()> {
        if self.network.private_key.trim().is_empty() {
            return Err(Error::InvalidConfig("private_key is empty".into()));
        }
        if self.grid.symbol.trim().is_empty() {
            return Err(Error::InvalidConfig("grid symbol is empty".into()));
        }
        if self.grid.grid_levels < 4 {
            return Err(Error::InvalidConfig(format!(
                "grid_levels must be at least 4, got {}",
                self.grid.grid_levels
            )));
        }
        if self.grid.grid_spacing_percent <= Decimal::ZERO
            || self.grid.grid_spacing_percent >= Decimal::ONE_HUNDRED
        {
            return Err(Error::InvalidConfig(format!(
                "grid_spacing_percent must be in (0, 100), got {}",
                self.grid.grid_spacing_percent
            )));
        }
        if self.grid.order_size_btc <= Decimal::ZERO {
            return Err(Error::InvalidConfig(format!(
                "order_size_btc must be positive, got {}",
                self.grid.order_size_btc
            )));
        }
        if self.grid.sync_interval_seconds == 0 {
            return Err(Error::InvalidConfig(
                "sync_interval_seconds must be at least 1".into(),
            ));
        }
        if self.risk.max_position_size_btc <= Decimal::ZERO {
            return Err(Error::InvalidConfig(
                "max_position_size_btc must be positive".into(),
            ));
        }
        if self.risk.max_drawdown_percent <= Decimal::ZERO
            || self.risk.max_drawdown_percent > Decimal::ONE_HUNDRED
        {
            return Err(Error::InvalidConfig(format!(
                "max_drawdown_percent must be in (0, 100], got {}",
                self.risk.max_drawdown_percent
            )));
        }
        if self.risk.min_grid_price >= self.risk.max_grid_price {
            return Err(Error::InvalidConfig(format!(
                "min_grid_price {} must be below max_grid_price {}",
                self.risk.min_grid_price, self.risk.max_grid_price
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn test_settings() -> Settings {
        Settings {
            network: NetworkSettings {
                private_key: "0x0123456789012345678901234567890123456789012345678901234567890123"
                    .to_string(),
                wallet_address: String::new(),
                mainnet: false,
            },
            grid: GridSettings {
                symbol: "BTC".to_string(),
                asset_index: None,
                grid_levels: 10,
                grid_spacing_percent: dec!(1),
                order_size_btc: dec!(0.001),
                sync_interval_seconds: 5,
            },
            risk: RiskSettings {
                max_position_size_btc: dec!(0.01),
                max_drawdown_percent: dec!(10),
                min_grid_price: dec!(10000),
                max_grid_price: dec!(150000),
            },
            server: ServerSettings::default(),
            log: LogSettings::default(),
        }
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(test_settings().validate().is_ok());
    }

    #[test]
    fn test_too_few_levels_rejected() {
        let mut settings = test_settings();
        settings.grid.grid_levels = 3;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_positive_spacing_rejected() {
        let mut settings = test_settings();
        settings.grid.grid_spacing_percent = Decimal::ZERO;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_inverted_price_range_rejected() {
        let mut settings = test_settings();
        settings.risk.min_grid_price = dec!(200000);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_spacing_fraction() {
        let settings = test_settings();
        assert_eq!(settings.grid.spacing_fraction(), dec!(0.01));
    }
}
