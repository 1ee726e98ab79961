//! Per-market cycle state: ladder orders, cumulative take-profits and
//! positions, indexed by `shockId`. This is the hard part of the engine —
//! everything else is plumbing around this module's decisions.

pub mod acceptance;
pub mod exit;
pub mod ladder;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::domain::{
    CumulativeTp, ExchangeOrderId, ExitReason, LadderOrder, LocalOrderId, MarketSlug, OrderStatus, Position, PriceTierFlag,
    ShockId, TokenId, TpStatus, TradeRecord,
};

/// Which kind of resting order an exchange order id maps to — an entry-side
/// ladder rung or a cycle's take-profit — so the reconciliation layer can
/// dispatch a fill without re-deriving it from the order's price or side.
#[derive(Debug, Clone)]
pub enum OrderRole {
    Ladder(LocalOrderId),
    TakeProfit(ShockId),
}

/// A ladder order alongside the side (A or B) its shares were drawn from, so
/// callers can translate a termination back into inventory operations without
/// this module needing to know the market's token ordering.
#[derive(Debug, Clone)]
pub struct ReturnedShares {
    pub token_id: TokenId,
    pub shares: u64,
}

/// Everything a cycle termination hands back to the caller to apply: which
/// resting orders to cancel at the exchange, which inventory to return, and
/// the trade records to persist.
#[derive(Debug, Clone, Default)]
pub struct TerminationOutcome {
    pub cancelled_orders: Vec<LadderOrder>,
    pub returned_shares: Vec<ReturnedShares>,
    pub trade_records: Vec<TradeRecord>,
    /// The cycle's resting take-profit order, if one was still live when the
    /// cycle terminated by a route other than the TP itself filling — the
    /// caller must cancel it at the exchange.
    pub cancelled_tp_exchange_order_id: Option<ExchangeOrderId>,
    pub held_token_id: Option<TokenId>,
}

/// Per-market book of ladder orders, cumulative TPs and positions.
pub struct CycleBook {
    market_slug: MarketSlug,
    ladder_orders: HashMap<LocalOrderId, LadderOrder>,
    cumulative_tps: HashMap<ShockId, CumulativeTp>,
    positions: HashMap<ShockId, Vec<Position>>,
    next_local_id: u64,
    order_roles: HashMap<ExchangeOrderId, OrderRole>,
}

impl CycleBook {
    #[must_use]
    pub fn new(market_slug: MarketSlug) -> Self {
        Self {
            market_slug,
            ladder_orders: HashMap::new(),
            cumulative_tps: HashMap::new(),
            positions: HashMap::new(),
            next_local_id: 0,
            order_roles: HashMap::new(),
        }
    }

    /// What `exchange_order_id` refers to in this book, if anything — an
    /// entry-side ladder rung or the cycle's resting take-profit.
    #[must_use]
    pub fn role_of(&self, exchange_order_id: &ExchangeOrderId) -> Option<&OrderRole> {
        self.order_roles.get(exchange_order_id)
    }

    fn forget_order(&mut self, exchange_order_id: &ExchangeOrderId) {
        self.order_roles.remove(exchange_order_id);
    }

    pub fn next_local_order_id(&mut self) -> LocalOrderId {
        let id = LocalOrderId(self.next_local_id);
        self.next_local_id += 1;
        id
    }

    /// `shockId`s with a non-terminal ladder order or an open position — the
    /// single definition of "cycle count" used by the acceptance gate.
    #[must_use]
    pub fn active_shock_ids(&self) -> HashSet<ShockId> {
        let mut ids: HashSet<ShockId> = self
            .ladder_orders
            .values()
            .filter(|order| !order.status.is_terminal())
            .map(|order| order.shock_id.clone())
            .collect();
        ids.extend(
            self.positions
                .iter()
                .filter(|(_, positions)| positions.iter().any(Position::is_open))
                .map(|(shock_id, _)| shock_id.clone()),
        );
        ids
    }

    #[must_use]
    pub fn active_cycle_count(&self) -> usize {
        self.active_shock_ids().len()
    }

    pub fn insert_pending_order(&mut self, order: LadderOrder) {
        self.ladder_orders.insert(order.local_id, order);
    }

    pub fn mark_resting(&mut self, local_id: LocalOrderId, exchange_order_id: ExchangeOrderId) {
        if let Some(order) = self.ladder_orders.get_mut(&local_id) {
            order.status = OrderStatus::Resting;
            order.exchange_order_id = Some(exchange_order_id.clone());
            self.order_roles.insert(exchange_order_id, OrderRole::Ladder(local_id));
        }
    }

    /// Record a newly-placed (or replaced) take-profit order's exchange id
    /// against its cycle, so a later fill on that id routes back here.
    pub fn set_tp_exchange_order_id(&mut self, shock_id: &ShockId, exchange_order_id: Option<ExchangeOrderId>) {
        let old = if let Some(tp) = self.cumulative_tps.get_mut(shock_id) {
            let old = tp.tp_exchange_order_id.take();
            if let Some(ref id) = exchange_order_id {
                self.order_roles.insert(id.clone(), OrderRole::TakeProfit(shock_id.clone()));
            }
            tp.tp_exchange_order_id = exchange_order_id;
            old
        } else {
            None
        };
        if let Some(old) = old {
            self.forget_order(&old);
        }
    }

    /// Mark a placement failure; returns the shares to credit back to
    /// inventory.
    pub fn mark_failed(&mut self, local_id: LocalOrderId) -> Option<ReturnedShares> {
        let order = self.ladder_orders.get_mut(&local_id)?;
        order.status = OrderStatus::Failed;
        Some(ReturnedShares { token_id: order.token_id.clone(), shares: order.shares })
    }

    /// Cancel a resting ladder order (stale-reaper or per-cycle exit path);
    /// returns the shares to credit back to inventory.
    pub fn cancel_resting(&mut self, local_id: LocalOrderId) -> Option<ReturnedShares> {
        let order = self.ladder_orders.get_mut(&local_id)?;
        if order.status != OrderStatus::Resting {
            return None;
        }
        order.status = OrderStatus::Cancelled;
        let exchange_order_id = order.exchange_order_id.clone();
        let returned = ReturnedShares { token_id: order.token_id.clone(), shares: order.shares };
        if let Some(id) = exchange_order_id {
            self.forget_order(&id);
        }
        Some(returned)
    }

    /// The resting exchange order id for a local ladder order, if any —
    /// needed by the caller to submit the matching cancel request.
    #[must_use]
    pub fn exchange_order_id_of(&self, local_id: LocalOrderId) -> Option<&ExchangeOrderId> {
        self.ladder_orders.get(&local_id)?.exchange_order_id.as_ref()
    }

    #[must_use]
    pub fn ladder_order(&self, local_id: LocalOrderId) -> Option<&LadderOrder> {
        self.ladder_orders.get(&local_id)
    }

    /// Every `Resting` order older than `max_age` — the stale-ladder reaper.
    #[must_use]
    pub fn stale_resting_orders(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<LocalOrderId> {
        self.ladder_orders
            .values()
            .filter(|order| order.status == OrderStatus::Resting && order.age(now) >= max_age)
            .map(|order| order.local_id)
            .collect()
    }

    /// Apply an entry fill for `local_id`: marks the order filled (fully or
    /// partially), folds the fill into the cycle's `CumulativeTp`, and opens a
    /// new `Position`. Returns the updated TP so the caller can cancel-replace
    /// the resting TP order.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_entry_fill(
        &mut self,
        local_id: LocalOrderId,
        fill_shares: u64,
        fill_price: Decimal,
        condition_id: crate::core::domain::ConditionId,
        tier_flag: PriceTierFlag,
        shock_team: Option<String>,
        held_token_id: TokenId,
        fade_target: Decimal,
        now: DateTime<Utc>,
    ) -> Option<&CumulativeTp> {
        let order = self.ladder_orders.get_mut(&local_id)?;
        order.filled_at = Some(now);
        order.fill_price = Some(fill_price);
        order.status = if fill_shares >= order.shares { OrderStatus::Filled } else { OrderStatus::Resting };
        let shock_id = order.shock_id.clone();
        let sold_token_id = order.token_id.clone();

        self.positions.entry(shock_id.clone()).or_default().push(Position::open(
            shock_id.clone(),
            self.market_slug.clone(),
            sold_token_id.clone(),
            held_token_id.clone(),
            fill_shares,
            fill_price,
            now,
        ));

        let needs_fresh = self
            .cumulative_tps
            .get(&shock_id)
            .map_or(true, |tp| tp.status.is_terminal());

        if needs_fresh {
            let tp = CumulativeTp::from_first_fill(
                shock_id.clone(),
                self.market_slug.clone(),
                condition_id,
                tier_flag,
                shock_team,
                sold_token_id,
                held_token_id,
                fill_shares,
                fill_price,
                fade_target,
                now,
            );
            self.cumulative_tps.insert(shock_id.clone(), tp);
        } else if let Some(tp) = self.cumulative_tps.get_mut(&shock_id) {
            tp.apply_entry_fill(fill_shares, fill_price, fade_target);
        }

        self.cumulative_tps.get(&shock_id)
    }

    #[must_use]
    pub fn cumulative_tp(&self, shock_id: &ShockId) -> Option<&CumulativeTp> {
        self.cumulative_tps.get(shock_id)
    }

    /// Apply a take-profit fill. Returns `Some(TerminationOutcome)` if this
    /// fill fully hits the TP and the cycle should terminate.
    pub fn apply_tp_fill(&mut self, shock_id: &ShockId, fill_shares: u64, fill_price: Decimal, now: DateTime<Utc>) -> Option<TerminationOutcome> {
        let hit = {
            let tp = self.cumulative_tps.get_mut(shock_id)?;
            tp.apply_tp_fill(fill_shares, fill_price)
        };

        // FIFO-reduce open positions by the filled shares, regardless of
        // whether this was a full or partial TP fill.
        let mut remaining = fill_shares;
        if let Some(positions) = self.positions.get_mut(shock_id) {
            for position in positions.iter_mut().filter(|p| p.is_open()) {
                if remaining == 0 {
                    break;
                }
                let taken = position.reduce(remaining);
                remaining -= taken;
                if position.remaining_shares() == 0 {
                    position.close(fill_price, now);
                }
            }
        }

        if hit {
            Some(self.terminate(shock_id, fill_price, ExitReason::TakeProfitHit, now))
        } else {
            None
        }
    }

    /// Tear down a cycle: cancel its resting ladder orders, close its
    /// positions at `exit_price`, remove its `CumulativeTp`, and emit trade
    /// records. Used by TP-hit, per-cycle event exit, scoring-run bail, and
    /// emergency timeout — every path but game-decided, which has its own
    /// unsellable-shares accounting.
    pub fn terminate(&mut self, shock_id: &ShockId, exit_price: Decimal, reason: ExitReason, now: DateTime<Utc>) -> TerminationOutcome {
        let mut outcome = TerminationOutcome::default();
        let mut forgotten = Vec::new();

        for order in self.ladder_orders.values_mut() {
            if &order.shock_id == shock_id && order.status == OrderStatus::Resting {
                order.status = OrderStatus::Cancelled;
                if let Some(id) = order.exchange_order_id.clone() {
                    forgotten.push(id);
                }
                outcome.returned_shares.push(ReturnedShares { token_id: order.token_id.clone(), shares: order.shares });
                outcome.cancelled_orders.push(order.clone());
            }
        }

        if let Some(positions) = self.positions.get_mut(shock_id) {
            for position in positions.iter_mut() {
                outcome.held_token_id.get_or_insert_with(|| position.held_token_id.clone());
                if position.is_open() {
                    position.close(exit_price, now);
                }
                outcome.trade_records.push(TradeRecord::new(
                    Uuid::new_v4(),
                    shock_id.clone(),
                    self.market_slug.clone(),
                    position.sold_token_id.clone(),
                    position.entry_shares,
                    position.entry_price,
                    position.entry_shares,
                    exit_price,
                    reason,
                    position.opened_at,
                    now,
                ));
            }
        }

        if let Some(tp) = self.cumulative_tps.get_mut(shock_id) {
            tp.status = TpStatus::Closed;
            if reason != ExitReason::TakeProfitHit {
                outcome.cancelled_tp_exchange_order_id = tp.tp_exchange_order_id.clone();
            }
            if let Some(id) = tp.tp_exchange_order_id.take() {
                forgotten.push(id);
            }
        }
        self.cumulative_tps.remove(shock_id);

        for id in forgotten {
            self.forget_order(&id);
        }

        outcome
    }

    #[must_use]
    pub fn positions_for(&self, shock_id: &ShockId) -> &[Position] {
        self.positions.get(shock_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn all_cumulative_tps(&self) -> impl Iterator<Item = &CumulativeTp> {
        self.cumulative_tps.values()
    }

    #[must_use]
    pub fn all_ladder_orders(&self) -> impl Iterator<Item = &LadderOrder> {
        self.ladder_orders.values()
    }

    #[must_use]
    pub fn all_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().flatten()
    }

    #[must_use]
    pub const fn market_slug(&self) -> &MarketSlug {
        &self.market_slug
    }
}
