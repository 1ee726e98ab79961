//! The supervisor: owns every market's [`CycleBook`] and the shared
//! [`InventoryLedger`], applies circuit breakers after each closed trade, and
//! validates hot config reloads before swapping them in.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::cycle::CycleBook;
use crate::core::detector::DetectorConfig;
use crate::core::domain::{ExchangeOrderId, MarketSlug, SupervisorState, TradeRecord};
use crate::core::inventory::{InventoryLedger, SizingConfig};
use crate::error::{Error, Result};

/// Risk limits checked after every closed trade.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub max_consecutive_losses: u32,
    pub max_session_loss: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self { max_consecutive_losses: 3, max_session_loss: Decimal::from(30) }
    }
}

/// Everything hot-reloadable in one snapshot, validated atomically: either
/// the whole reload is accepted, or none of it is and the prior config stays
/// in effect for every shock still in flight.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub detector: DetectorConfig,
    pub sizing: SizingConfig,
    pub risk: RiskConfig,
    pub sell_price_max: Decimal,
    pub late_game_sell_price_max: Decimal,
    pub ladder_spacing: Decimal,
    pub fade_target: Decimal,
}

impl RuntimeConfig {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.detector.is_valid()
            && !self.sizing.ladder_sizes.is_empty()
            && self.sizing.ladder_sizes.iter().all(|&s| s > 0)
            && self.sizing.max_concurrent_games > 0
            && self.sell_price_max > Decimal::ZERO
            && self.sell_price_max < Decimal::ONE
            && self.late_game_sell_price_max > Decimal::ZERO
            && self.late_game_sell_price_max <= self.sell_price_max
    }
}

/// Owns per-market cycle state, the shared inventory ledger and session risk
/// counters. Single point of mutation for everything the cycle engine and
/// reconciliation layer act against.
pub struct Supervisor {
    config: RuntimeConfig,
    books: HashMap<MarketSlug, CycleBook>,
    inventory: InventoryLedger,
    state: SupervisorState,
    /// Which market a resting exchange order belongs to, so a fill event —
    /// which carries only an order id — can be routed to the right
    /// `CycleBook` without scanning every book.
    order_index: HashMap<ExchangeOrderId, MarketSlug>,
    /// Markets whose game has resolved; re-entry is refused for these even if
    /// a new shock is detected, since there is no one left to trade against.
    decided_markets: HashSet<MarketSlug>,
    /// Every closed trade this session, kept for checkpoint export.
    trade_log: Vec<TradeRecord>,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: RuntimeConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            config,
            books: HashMap::new(),
            inventory: InventoryLedger::new(),
            state: SupervisorState::new(started_at),
            order_index: HashMap::new(),
            decided_markets: HashSet::new(),
            trade_log: Vec::new(),
        }
    }

    /// Record that `exchange_order_id` belongs to `market_slug`'s book — call
    /// this whenever a ladder rung or take-profit order is placed.
    pub fn register_order(&mut self, exchange_order_id: ExchangeOrderId, market_slug: MarketSlug) {
        self.order_index.insert(exchange_order_id, market_slug);
    }

    /// Drop an order from the index once it terminates (filled or cancelled).
    pub fn forget_order(&mut self, exchange_order_id: &ExchangeOrderId) {
        self.order_index.remove(exchange_order_id);
    }

    #[must_use]
    pub fn market_of_order(&self, exchange_order_id: &ExchangeOrderId) -> Option<&MarketSlug> {
        self.order_index.get(exchange_order_id)
    }

    pub fn mark_game_decided(&mut self, market_slug: MarketSlug) {
        self.decided_markets.insert(market_slug);
    }

    #[must_use]
    pub fn is_game_decided(&self, market_slug: &MarketSlug) -> bool {
        self.decided_markets.contains(market_slug)
    }

    pub fn market_slugs(&self) -> impl Iterator<Item = &MarketSlug> {
        self.books.keys()
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    #[must_use]
    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut InventoryLedger {
        &mut self.inventory
    }

    pub fn book_mut(&mut self, market_slug: &MarketSlug) -> &mut CycleBook {
        self.books.entry(market_slug.clone()).or_insert_with(|| CycleBook::new(market_slug.clone()))
    }

    #[must_use]
    pub fn book(&self, market_slug: &MarketSlug) -> Option<&CycleBook> {
        self.books.get(market_slug)
    }

    pub fn remove_book(&mut self, market_slug: &MarketSlug) {
        self.books.remove(market_slug);
    }

    /// Validate and swap in a new config. A rejected reload leaves the prior
    /// config untouched and returns the reason; accepted reloads take effect
    /// on the next shock evaluated, not on cycles already in flight.
    pub fn reload_config(&mut self, candidate: RuntimeConfig) -> Result<()> {
        if !candidate.is_valid() {
            return Err(Error::InvalidReload("rejected: failed validation".to_string()));
        }
        self.config = candidate;
        Ok(())
    }

    /// Fold one closed trade into the session's running risk counters and
    /// trip the circuit breaker if either limit is now exceeded. Once
    /// halted, the supervisor never un-halts itself — only a fresh process
    /// (after operator intervention) clears it.
    pub fn record_trade(&mut self, record: &TradeRecord) {
        self.state.record_trade(record.realized_pnl);
        if self.state.consecutive_losses >= self.config.risk.max_consecutive_losses {
            self.state.halt(format!("{} consecutive losses", self.state.consecutive_losses));
        }
        if self.state.session_pnl <= -self.config.risk.max_session_loss {
            self.state.halt(format!("session loss {} exceeds cap", self.state.session_pnl));
        }
        self.trade_log.push(record.clone());
    }

    #[must_use]
    pub fn trade_log(&self) -> &[TradeRecord] {
        &self.trade_log
    }

    /// Build a full checkpoint document from the current in-memory state.
    #[must_use]
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> crate::core::persistence::Snapshot {
        let mut inventories = HashMap::new();
        let mut ladder_orders = Vec::new();
        let mut cumulative_tps = HashMap::new();
        let mut positions: HashMap<crate::core::domain::ShockId, Vec<crate::core::domain::Position>> = HashMap::new();

        for (slug, book) in &self.books {
            if let Some(inventory) = self.inventory.get(slug) {
                inventories.insert(slug.clone(), inventory.clone());
            }
            ladder_orders.extend(book.all_ladder_orders().cloned());
            for tp in book.all_cumulative_tps() {
                cumulative_tps.insert(tp.shock_id.clone(), tp.clone());
            }
            for position in book.all_positions() {
                positions.entry(position.shock_id.clone()).or_default().push(position.clone());
            }
        }

        crate::core::persistence::Snapshot::new(
            saved_at,
            inventories,
            ladder_orders,
            cumulative_tps,
            positions,
            self.trade_log.clone(),
            self.state.clone(),
        )
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    /// Best-effort shutdown sequence: refuse new shocks (the caller stops
    /// feeding them), merge every market's balanced inventory back to
    /// collateral, and hand back the set of markets that still had mergeable
    /// shares so the caller can submit those on-chain merges before exiting.
    #[must_use]
    pub fn markets_pending_merge_on_shutdown(&self) -> Vec<MarketSlug> {
        self.books.keys().filter(|slug| self.inventory.mergeable(slug) > 0).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            detector: DetectorConfig::default(),
            sizing: SizingConfig { ladder_sizes: vec![5, 10, 15], max_cycles_per_game: 1, max_concurrent_games: 3 },
            risk: RiskConfig::default(),
            sell_price_max: dec!(0.85),
            late_game_sell_price_max: dec!(0.70),
            ladder_spacing: dec!(0.03),
            fade_target: dec!(0.03),
        }
    }

    fn started_at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn trade_record(pnl: Decimal) -> TradeRecord {
        use crate::core::domain::{ExitReason, MarketSlug, ShockId, TokenId};
        TradeRecord::new(
            uuid::Uuid::new_v4(),
            ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000),
            MarketSlug::from("m"),
            TokenId::from("token-a"),
            10,
            dec!(0.60),
            10,
            Decimal::ONE - dec!(0.60) + pnl / Decimal::from(10),
            ExitReason::TakeProfitHit,
            started_at(),
            started_at(),
        )
    }

    #[test]
    fn halts_after_max_consecutive_losses() {
        let mut supervisor = Supervisor::new(config(), started_at());
        for _ in 0..3 {
            supervisor.record_trade(&trade_record(dec!(-1.0)));
        }
        assert!(supervisor.is_halted());
    }

    #[test]
    fn halts_when_session_loss_cap_is_exceeded() {
        let mut supervisor = Supervisor::new(config(), started_at());
        supervisor.record_trade(&trade_record(dec!(-31.0)));
        assert!(supervisor.is_halted());
    }

    #[test]
    fn stays_unhalted_under_the_caps() {
        let mut supervisor = Supervisor::new(config(), started_at());
        supervisor.record_trade(&trade_record(dec!(-1.0)));
        supervisor.record_trade(&trade_record(dec!(1.0)));
        assert!(!supervisor.is_halted());
    }

    #[test]
    fn rejected_reload_leaves_prior_config_intact() {
        let mut supervisor = Supervisor::new(config(), started_at());
        let mut bad = config();
        bad.sizing.ladder_sizes = vec![];
        let result = supervisor.reload_config(bad);
        assert!(result.is_err());
        assert_eq!(supervisor.config().sizing.ladder_sizes, vec![5, 10, 15]);
    }

    #[test]
    fn order_index_routes_an_exchange_order_id_to_its_market() {
        use crate::core::domain::ExchangeOrderId;
        let mut supervisor = Supervisor::new(config(), started_at());
        let order_id = ExchangeOrderId::new("ex-1");
        supervisor.register_order(order_id.clone(), MarketSlug::from("m"));
        assert_eq!(supervisor.market_of_order(&order_id), Some(&MarketSlug::from("m")));
        supervisor.forget_order(&order_id);
        assert_eq!(supervisor.market_of_order(&order_id), None);
    }

    #[test]
    fn decided_markets_are_tracked() {
        let mut supervisor = Supervisor::new(config(), started_at());
        assert!(!supervisor.is_game_decided(&MarketSlug::from("m")));
        supervisor.mark_game_decided(MarketSlug::from("m"));
        assert!(supervisor.is_game_decided(&MarketSlug::from("m")));
    }

    #[test]
    fn snapshot_exports_inventory_and_trade_log() {
        use crate::core::domain::{ConditionId, PriceTierFlag};
        let mut supervisor = Supervisor::new(config(), started_at());
        supervisor
            .inventory_mut()
            .create_or_top_up(MarketSlug::from("m"), ConditionId::from("c"), PriceTierFlag::Standard, 45, dec!(45.0), &config().sizing)
            .unwrap();
        supervisor.book_mut(&MarketSlug::from("m"));
        supervisor.record_trade(&trade_record(dec!(1.0)));

        let snapshot = supervisor.snapshot(started_at());
        assert_eq!(snapshot.inventories.len(), 1);
        assert_eq!(snapshot.trade_records.len(), 1);
    }

    #[test]
    fn valid_reload_is_applied() {
        let mut supervisor = Supervisor::new(config(), started_at());
        let mut next = config();
        next.sell_price_max = dec!(0.80);
        supervisor.reload_config(next).unwrap();
        assert_eq!(supervisor.config().sell_price_max, dec!(0.80));
    }
}
