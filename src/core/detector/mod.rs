//! Statistical shock detection: consumes orderbook ticks, emits [`Shock`]
//! candidates subject to cooldowns and price-range gating.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::core::domain::{Direction, MarketSlug, Shock, TokenId};
use crate::core::stats::PriceWindow;

/// Hot-reloadable detector parameters. A reload takes effect on the next tick;
/// in-flight ticks keep using whatever snapshot they already read.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub sigma_threshold: f64,
    pub min_absolute_move: f64,
    pub rolling_window_ms: i64,
    pub cooldown_ms: i64,
    pub target_price_min: Decimal,
    pub target_price_max: Decimal,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sigma_threshold: 3.0,
            min_absolute_move: 0.03,
            rolling_window_ms: 60_000,
            cooldown_ms: 30_000,
            target_price_min: Decimal::new(7, 2),
            target_price_max: Decimal::new(91, 2),
        }
    }
}

impl DetectorConfig {
    /// Reject configurations with non-positive sizes or an inverted price
    /// range; callers (the supervisor's hot-reload path) apply this before
    /// swapping in a new snapshot.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.sigma_threshold > 0.0
            && self.min_absolute_move > 0.0
            && self.rolling_window_ms > 0
            && self.cooldown_ms >= 0
            && self.target_price_min < self.target_price_max
    }
}

/// Consumes per-token orderbook ticks and emits shock candidates.
pub struct ShockDetector {
    config: DetectorConfig,
    windows: HashMap<TokenId, PriceWindow>,
    last_shock_by_token: HashMap<TokenId, DateTime<Utc>>,
    last_shock_by_market: HashMap<MarketSlug, DateTime<Utc>>,
}

impl ShockDetector {
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
            last_shock_by_token: HashMap::new(),
            last_shock_by_market: HashMap::new(),
        }
    }

    /// Install a new configuration snapshot, effective on the next tick.
    pub fn reload(&mut self, config: DetectorConfig) {
        self.config = config;
    }

    /// Clear the per-market cooldown so the next overshoot on `market_slug`
    /// can be acted on immediately. Called by the classifier when a shock was
    /// rejected without trading.
    pub fn reset_cooldown(&mut self, market_slug: &MarketSlug) {
        self.last_shock_by_market.remove(market_slug);
    }

    /// Feed one orderbook tick; returns a candidate shock if this tick crosses
    /// the detector's thresholds and isn't suppressed by cooldown.
    pub fn on_tick(
        &mut self,
        token_id: &TokenId,
        market_slug: &MarketSlug,
        bid: Decimal,
        ask: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Option<Shock> {
        let mid = (bid + ask) / Decimal::TWO;
        if mid < self.config.target_price_min || mid > self.config.target_price_max {
            return None;
        }

        let window = self
            .windows
            .entry(token_id.clone())
            .or_insert_with(|| PriceWindow::new(self.config.rolling_window_ms));
        let signal = window.push(timestamp, mid)?;

        let is_candidate = signal.z_score.abs() >= self.config.sigma_threshold
            || signal.last_return.abs() >= self.config.min_absolute_move;
        if !is_candidate {
            return None;
        }

        if self.in_cooldown(token_id, market_slug, timestamp) {
            return None;
        }

        self.last_shock_by_token.insert(token_id.clone(), timestamp);
        self.last_shock_by_market.insert(market_slug.clone(), timestamp);

        let direction = if signal.last_return >= 0.0 { Direction::Up } else { Direction::Down };
        let magnitude = Decimal::from_f64(signal.last_return.abs()).unwrap_or(Decimal::ZERO);
        let z_score = Decimal::from_f64(signal.z_score).unwrap_or(Decimal::ZERO);
        let pre_shock_price = mid - Decimal::from_f64(signal.last_return).unwrap_or(Decimal::ZERO);

        Some(Shock {
            token_id: token_id.clone(),
            market_slug: market_slug.clone(),
            direction,
            magnitude,
            z_score,
            pre_shock_price,
            current_price: mid,
            timestamp,
        })
    }

    fn in_cooldown(&self, token_id: &TokenId, market_slug: &MarketSlug, timestamp: DateTime<Utc>) -> bool {
        let cooldown = chrono::Duration::milliseconds(self.config.cooldown_ms);
        let token_blocked = self
            .last_shock_by_token
            .get(token_id)
            .is_some_and(|last| timestamp - *last < cooldown);
        let market_blocked = self
            .last_shock_by_market
            .get(market_slug)
            .is_some_and(|last| timestamp - *last < cooldown);
        token_blocked || market_blocked
    }
}
