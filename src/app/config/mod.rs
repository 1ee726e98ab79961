//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; the wallet private key is an
//! environment-variable override, never a config-file field, so it never
//! ends up in a checked-in file or a persisted snapshot.

use std::path::Path;

use serde::Deserialize;

use crate::core::supervisor::RuntimeConfig;
use crate::error::{Error, Result};

mod detector;
mod ladder;
mod logging;
mod persistence;
mod polymarket;
mod risk;

pub use detector::DetectorConfigToml;
pub use ladder::{ClassifierConfigToml, LadderConfigToml};
pub use logging::LoggingConfig;
pub use persistence::PersistenceConfigToml;
pub use polymarket::{Environment, PolymarketConfig};
pub use risk::RiskConfigToml;

/// Top-level application configuration, as loaded from `shockfade.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub detector: DetectorConfigToml,
    #[serde(default)]
    pub classifier: ClassifierConfigToml,
    #[serde(default)]
    pub ladder: LadderConfigToml,
    #[serde(default)]
    pub risk: RiskConfigToml,
    #[serde(default)]
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub persistence: PersistenceConfigToml,
    /// Dry-run is `true` unless the config file explicitly opts out — live
    /// trading requires a deliberate `dry_run = false` plus a funded wallet.
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            detector: DetectorConfigToml::default(),
            classifier: ClassifierConfigToml::default(),
            ladder: LadderConfigToml::default(),
            risk: RiskConfigToml::default(),
            polymarket: PolymarketConfig::default(),
            persistence: PersistenceConfigToml::default(),
            dry_run: true,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.as_ref().display())))?;
        let mut config: Self = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;

        if let Ok(key) = std::env::var("WALLET_PRIVATE_KEY") {
            config.polymarket.private_key = Some(key);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ladder.ladder_sizes.is_empty() {
            return Err(Error::Config("ladder.ladder_sizes must not be empty".to_string()));
        }
        if self.ladder.ladder_sizes.iter().any(|&s| s == 0) {
            return Err(Error::Config("ladder.ladder_sizes entries must be positive".to_string()));
        }
        if self.ladder.max_concurrent_games == 0 {
            return Err(Error::Config("ladder.max_concurrent_games must be positive".to_string()));
        }
        if self.detector.sigma_threshold <= 0.0 {
            return Err(Error::Config("detector.sigma_threshold must be positive".to_string()));
        }
        if self.detector.target_price_min >= self.detector.target_price_max {
            return Err(Error::Config("detector.target_price_min must be below target_price_max".to_string()));
        }
        if !self.dry_run && self.polymarket.private_key.is_none() {
            return Err(Error::Config("live trading (dry_run = false) requires WALLET_PRIVATE_KEY".to_string()));
        }
        Ok(())
    }

    /// Project onto the supervisor's hot-reloadable runtime config.
    #[must_use]
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            detector: self.detector.clone().into(),
            sizing: self.ladder.sizing(),
            risk: self.risk.clone().into(),
            sell_price_max: self.ladder.sell_price_max,
            late_game_sell_price_max: self.ladder.late_game_sell_price_max,
            ladder_spacing: self.ladder.ladder_spacing,
            fade_target: self.ladder.fade_target_cents,
        }
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn live_trading_without_a_private_key_is_rejected() {
        let mut config = Config::default();
        config.dry_run = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_ladder_sizes_is_rejected() {
        let mut config = Config::default();
        config.ladder.ladder_sizes = vec![];
        assert!(config.validate().is_err());
    }
}
