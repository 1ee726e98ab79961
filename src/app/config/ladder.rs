//! Ladder sizing and classifier configuration blocks.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::classifier::ClassifierConfig;
use crate::core::inventory::SizingConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct LadderConfigToml {
    #[serde(default = "default_ladder_sizes")]
    pub ladder_sizes: Vec<u64>,
    #[serde(default = "default_ladder_spacing")]
    pub ladder_spacing: Decimal,
    #[serde(default = "default_fade_target_cents")]
    pub fade_target_cents: Decimal,
    #[serde(default = "default_sell_price_max")]
    pub sell_price_max: Decimal,
    #[serde(default = "default_late_game_sell_price_max")]
    pub late_game_sell_price_max: Decimal,
    #[serde(default = "default_max_concurrent_games")]
    pub max_concurrent_games: usize,
    #[serde(default = "default_max_cycles_per_game")]
    pub max_cycles_per_game: u32,
}

fn default_ladder_sizes() -> Vec<u64> {
    vec![5, 10, 15]
}

fn default_ladder_spacing() -> Decimal {
    Decimal::new(3, 2)
}

fn default_fade_target_cents() -> Decimal {
    Decimal::new(3, 2)
}

fn default_sell_price_max() -> Decimal {
    Decimal::new(85, 2)
}

fn default_late_game_sell_price_max() -> Decimal {
    Decimal::new(70, 2)
}

const fn default_max_concurrent_games() -> usize {
    3
}

const fn default_max_cycles_per_game() -> u32 {
    1
}

impl Default for LadderConfigToml {
    fn default() -> Self {
        Self {
            ladder_sizes: default_ladder_sizes(),
            ladder_spacing: default_ladder_spacing(),
            fade_target_cents: default_fade_target_cents(),
            sell_price_max: default_sell_price_max(),
            late_game_sell_price_max: default_late_game_sell_price_max(),
            max_concurrent_games: default_max_concurrent_games(),
            max_cycles_per_game: default_max_cycles_per_game(),
        }
    }
}

impl LadderConfigToml {
    #[must_use]
    pub fn sizing(&self) -> SizingConfig {
        SizingConfig {
            ladder_sizes: self.ladder_sizes.clone(),
            max_cycles_per_game: self.max_cycles_per_game,
            max_concurrent_games: self.max_concurrent_games,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfigToml {
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: i64,
    #[serde(default = "default_active_poll_ms")]
    pub active_poll_ms: i64,
    #[serde(default = "default_event_window_ms")]
    pub event_window_ms: i64,
    #[serde(default = "default_shock_deadline_ms")]
    pub shock_deadline_ms: i64,
}

const fn default_idle_poll_ms() -> i64 {
    10_000
}

const fn default_active_poll_ms() -> i64 {
    1_000
}

const fn default_event_window_ms() -> i64 {
    120_000
}

const fn default_shock_deadline_ms() -> i64 {
    10_000
}

impl Default for ClassifierConfigToml {
    fn default() -> Self {
        Self {
            idle_poll_ms: default_idle_poll_ms(),
            active_poll_ms: default_active_poll_ms(),
            event_window_ms: default_event_window_ms(),
            shock_deadline_ms: default_shock_deadline_ms(),
        }
    }
}

impl From<ClassifierConfigToml> for ClassifierConfig {
    fn from(toml: ClassifierConfigToml) -> Self {
        Self {
            idle_poll_ms: toml.idle_poll_ms,
            active_poll_ms: toml.active_poll_ms,
            event_window_ms: toml.event_window_ms,
            shock_deadline_ms: toml.shock_deadline_ms,
        }
    }
}
