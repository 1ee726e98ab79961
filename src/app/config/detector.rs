//! Shock-detector configuration block.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::detector::DetectorConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfigToml {
    #[serde(default = "default_sigma_threshold")]
    pub sigma_threshold: f64,
    #[serde(default = "default_min_absolute_move")]
    pub min_absolute_move: f64,
    #[serde(default = "default_rolling_window_ms")]
    pub rolling_window_ms: i64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: i64,
    #[serde(default = "default_target_price_min")]
    pub target_price_min: Decimal,
    #[serde(default = "default_target_price_max")]
    pub target_price_max: Decimal,
}

fn default_sigma_threshold() -> f64 {
    3.0
}

fn default_min_absolute_move() -> f64 {
    0.03
}

const fn default_rolling_window_ms() -> i64 {
    60_000
}

const fn default_cooldown_ms() -> i64 {
    30_000
}

fn default_target_price_min() -> Decimal {
    Decimal::new(7, 2)
}

fn default_target_price_max() -> Decimal {
    Decimal::new(91, 2)
}

impl Default for DetectorConfigToml {
    fn default() -> Self {
        Self {
            sigma_threshold: default_sigma_threshold(),
            min_absolute_move: default_min_absolute_move(),
            rolling_window_ms: default_rolling_window_ms(),
            cooldown_ms: default_cooldown_ms(),
            target_price_min: default_target_price_min(),
            target_price_max: default_target_price_max(),
        }
    }
}

impl From<DetectorConfigToml> for DetectorConfig {
    fn from(toml: DetectorConfigToml) -> Self {
        Self {
            sigma_threshold: toml.sigma_threshold,
            min_absolute_move: toml.min_absolute_move,
            rolling_window_ms: toml.rolling_window_ms,
            cooldown_ms: toml.cooldown_ms,
            target_price_min: toml.target_price_min,
            target_price_max: toml.target_price_max,
        }
    }
}
