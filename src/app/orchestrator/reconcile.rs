//! Push-stream fill handling: route a reconciled outcome to the owning
//! cycle's entry-fill or TP-fill path, re-resting the take-profit whenever a
//! new entry fill moves the cycle's cost basis.

use tracing::{debug, warn};

use crate::app::state::AppState;
use crate::core::cycle::OrderRole;
use crate::core::domain::ExchangeOrderId;
use crate::core::exchange::{ExchangeClient, FillEvent};
use crate::core::reconciliation::{FillReconciler, Outcome};
use crate::error::Result;

use super::tp::finish_tp_fill;

pub async fn reconcile_fill(state: &AppState, reconciler: &mut FillReconciler, exchange: &dyn ExchangeClient, event: FillEvent) -> Result<()> {
    let order_id = event.order_id.clone();
    let Some(outcome) = reconciler.observe_push(event) else {
        return Ok(());
    };

    let Some(market_slug) = state.supervisor().market_of_order(&order_id).cloned() else {
        debug!(order_id = %order_id, "fill for an order this process doesn't track, ignoring");
        return Ok(());
    };

    match outcome {
        Outcome::Cancelled => {
            let role = state.supervisor().book(&market_slug).and_then(|book| book.role_of(&order_id).cloned());
            let Some(role) = role else {
                debug!(order_id = %order_id, market = %market_slug, "cancellation for an order with no recorded role, ignoring");
                return Ok(());
            };
            handle_cancellation(state, &market_slug, &order_id, &role);
        }
        Outcome::Filled { shares, price } => {
            let role = state.supervisor().book(&market_slug).and_then(|book| book.role_of(&order_id).cloned());
            let Some(role) = role else {
                debug!(order_id = %order_id, market = %market_slug, "fill for an order with no recorded role, ignoring");
                return Ok(());
            };
            dispatch_fill(state, reconciler, exchange, &market_slug, &order_id, role, shares, price).await?;
        }
        Outcome::CancelFillRace { shares, price, role } => {
            warn!(order_id = %order_id, market = %market_slug, "cancel lost the race to a push fill, reopening the cycle");
            dispatch_fill(state, reconciler, exchange, &market_slug, &order_id, role, shares, price).await?;
        }
    }

    Ok(())
}

async fn dispatch_fill(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    market_slug: &crate::core::domain::MarketSlug,
    order_id: &ExchangeOrderId,
    role: OrderRole,
    shares: u64,
    price: rust_decimal::Decimal,
) -> Result<()> {
    match role {
        OrderRole::Ladder(local_id) => {
            handle_ladder_fill(state, reconciler, exchange, market_slug, local_id, order_id, shares, price).await?;
        }
        OrderRole::TakeProfit(shock_id) => {
            finish_tp_fill(state, reconciler, exchange, market_slug, &shock_id, shares, price).await?;
            state.supervisor_mut().forget_order(order_id);
        }
    }
    Ok(())
}

fn handle_cancellation(state: &AppState, market_slug: &crate::core::domain::MarketSlug, order_id: &ExchangeOrderId, role: &OrderRole) {
    state.supervisor_mut().forget_order(order_id);
    let OrderRole::Ladder(local_id) = role else {
        return;
    };
    let returned = { state.supervisor_mut().book_mut(market_slug).cancel_resting(*local_id) };
    let Some(returned) = returned else { return };
    let markets = state.markets();
    let is_token_a = markets.market_for_token(&returned.token_id).map(|m| markets.is_token_a(m, &returned.token_id)).unwrap_or(true);
    let _ = state.supervisor_mut().inventory_mut().return_sell_side(market_slug, is_token_a, returned.shares);
}

async fn handle_ladder_fill(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    market_slug: &crate::core::domain::MarketSlug,
    local_id: crate::core::domain::LocalOrderId,
    order_id: &ExchangeOrderId,
    shares: u64,
    price: rust_decimal::Decimal,
) -> Result<()> {
    let now = chrono::Utc::now();

    let entry = {
        let supervisor = state.supervisor();
        let Some(book) = supervisor.book(market_slug) else { return Ok(()) };
        let Some(order) = book.ladder_order(local_id) else { return Ok(()) };
        let sold_token_id = order.token_id.clone();
        let shock_id = order.shock_id.clone();
        let shock_team = order.shock_team.clone();
        let fully_filled = shares >= order.shares;
        let inventory = supervisor.inventory().get(market_slug);
        let Some(condition_id) = inventory.map(|i| i.condition_id.clone()) else {
            warn!(market = %market_slug, "ladder fill with no inventory entry, dropping");
            return Ok(());
        };
        let tier_flag = inventory.map(|i| i.tier_flag).unwrap_or_default();
        let fade_target = supervisor.config().fade_target;
        (sold_token_id, shock_id, shock_team, fully_filled, condition_id, tier_flag, fade_target)
    };
    let (sold_token_id, shock_id, shock_team, fully_filled, condition_id, tier_flag, fade_target) = entry;

    let held_token_id = {
        let markets = state.markets();
        markets.market_for_token(&sold_token_id).and_then(|m| m.complement_of(&sold_token_id)).cloned().unwrap_or_else(|| sold_token_id.clone())
    };
    let is_token_a = {
        let markets = state.markets();
        markets.market_for_token(&sold_token_id).map(|m| markets.is_token_a(m, &sold_token_id)).unwrap_or(true)
    };

    {
        let mut supervisor = state.supervisor_mut();
        supervisor.book_mut(market_slug).apply_entry_fill(
            local_id,
            shares,
            price,
            condition_id,
            tier_flag,
            shock_team,
            held_token_id.clone(),
            fade_target,
            now,
        );
        let _ = supervisor.inventory_mut().consume_sell_side(market_slug, &held_token_id, !is_token_a, shares);
        if fully_filled {
            supervisor.forget_order(order_id);
        }
    }

    if let Err(err) = super::tp::place_or_replace_tp(state, reconciler, exchange, market_slug, &shock_id).await {
        warn!(market = %market_slug, %shock_id, error = %err, "take-profit replacement failed after entry fill");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{ConditionId, LadderOrder, LocalOrderId, MarketSlug, PriceTierFlag, ShockId, TokenId};
    use crate::core::exchange::{FillKind, OpenOrderSummary, OrderDetails, PlacementResult};
    use crate::core::inventory::SizingConfig;
    use crate::core::supervisor::RuntimeConfig;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct StubExchange {
        cancels: Mutex<Vec<ExchangeOrderId>>,
        placements: Mutex<Vec<(TokenId, u64, Decimal)>>,
    }

    impl StubExchange {
        fn new() -> Self {
            Self { cancels: Mutex::new(Vec::new()), placements: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ExchangeClient for StubExchange {
        async fn place_sell_limit_gtc(&self, token_id: &TokenId, shares: u64, price: Decimal, _tier_flag: PriceTierFlag) -> Result<PlacementResult> {
            self.placements.lock().unwrap().push((token_id.clone(), shares, price));
            Ok(PlacementResult { order_id: ExchangeOrderId::new(format!("tp-{token_id}")), filled_shares: 0, filled_price: None })
        }
        async fn cancel(&self, order_id: &ExchangeOrderId) -> Result<()> {
            self.cancels.lock().unwrap().push(order_id.clone());
            Ok(())
        }
        async fn open_orders(&self, _condition_id: &str) -> Result<Vec<OpenOrderSummary>> {
            Ok(vec![])
        }
        async fn order(&self, order_id: &ExchangeOrderId) -> Result<OrderDetails> {
            Ok(OrderDetails { order_id: order_id.clone(), status: "LIVE".into(), filled_shares: 0, filled_price: None })
        }
        async fn token_balance(&self, _token_id: &TokenId) -> Result<u64> {
            Ok(0)
        }
        async fn collateral_balance(&self) -> Result<Decimal> {
            Ok(Decimal::ZERO)
        }
    }

    fn runtime_config() -> RuntimeConfig {
        use crate::core::detector::DetectorConfig;
        use crate::core::supervisor::RiskConfig;
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

    fn started_at() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn market_slug() -> MarketSlug {
        MarketSlug::from("m")
    }

    fn setup(state: &AppState) -> LocalOrderId {
        let market = crate::core::domain::Market::new(
            market_slug(),
            ConditionId::from("c"),
            TokenId::from("token-a"),
            TokenId::from("token-b"),
            "A".into(),
            "B".into(),
            PriceTierFlag::Standard,
            crate::core::domain::LifecycleState::Active,
        );
        state.markets_mut().replace(vec![market]);

        let mut supervisor = state.supervisor_mut();
        supervisor
            .inventory_mut()
            .create_or_top_up(market_slug(), ConditionId::from("c"), PriceTierFlag::Standard, 30, dec!(30.0), &runtime_config().sizing)
            .unwrap();
        let shock_id = ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000);
        let local_id = supervisor.book_mut(&market_slug()).next_local_order_id();
        supervisor.book_mut(&market_slug()).insert_pending_order(LadderOrder::new(
            local_id,
            TokenId::from("token-a"),
            market_slug(),
            dec!(0.61),
            5,
            1,
            shock_id,
            Some("GSW".to_string()),
            started_at(),
        ));
        supervisor.book_mut(&market_slug()).mark_resting(local_id, ExchangeOrderId::new("ex-1"));
        supervisor.register_order(ExchangeOrderId::new("ex-1"), market_slug());
        local_id
    }

    #[tokio::test]
    async fn ladder_fill_opens_a_position_and_rests_a_take_profit() {
        let state = AppState::new(runtime_config(), started_at());
        setup(&state);
        let mut reconciler = FillReconciler::new();
        let exchange = StubExchange::new();

        let event = FillEvent { order_id: ExchangeOrderId::new("ex-1"), kind: FillKind::Matched, price: Some(dec!(0.61)), size: Some(5) };
        reconcile_fill(&state, &mut reconciler, &exchange, event).await.unwrap();

        let supervisor = state.supervisor();
        let book = supervisor.book(&market_slug()).unwrap();
        let shock_id = ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000);
        let tp = book.cumulative_tp(&shock_id).unwrap();
        assert_eq!(tp.tp_price, dec!(0.42));
        assert_eq!(exchange.placements.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_returns_shares_to_inventory() {
        let state = AppState::new(runtime_config(), started_at());
        setup(&state);
        let mut reconciler = FillReconciler::new();
        let exchange = StubExchange::new();

        let event = FillEvent { order_id: ExchangeOrderId::new("ex-1"), kind: FillKind::Cancellation, price: None, size: None };
        reconcile_fill(&state, &mut reconciler, &exchange, event).await.unwrap();

        let supervisor = state.supervisor();
        assert_eq!(supervisor.inventory().get(&market_slug()).unwrap().shares_a, 30);
        assert!(supervisor.market_of_order(&ExchangeOrderId::new("ex-1")).is_none());
    }

    #[tokio::test]
    async fn unknown_order_id_is_ignored() {
        let state = AppState::new(runtime_config(), started_at());
        setup(&state);
        let mut reconciler = FillReconciler::new();
        let exchange = StubExchange::new();

        let event = FillEvent { order_id: ExchangeOrderId::new("unknown"), kind: FillKind::Matched, price: Some(dec!(0.5)), size: Some(5) };
        reconcile_fill(&state, &mut reconciler, &exchange, event).await.unwrap();
        assert!(exchange.placements.lock().unwrap().is_empty());
    }
}
