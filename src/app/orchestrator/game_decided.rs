//! Game-decided termination: once any monitored token's mid crosses the
//! extreme threshold, the game is over and every cycle on that market closes
//! without submitting a sell — losing shares are unsellable, winning shares
//! redeem on settlement. Runs at most once per market.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::app::state::AppState;
use crate::core::cycle::OrderRole;
use crate::core::domain::{ExitReason, Market, TokenId};
use crate::core::exchange::{ExchangeClient, OnChainClient};
use crate::core::reconciliation::FillReconciler;
use crate::error::Result;

const DECIDED_HIGH: Decimal = dec!(0.99);
const DECIDED_LOW: Decimal = dec!(0.01);

/// Inspect one tick's mid and, if it crosses the decided threshold and the
/// market hasn't already been marked decided, tear the whole market down.
pub async fn check_tick(
    state: &AppState,
    reconciler: &mut FillReconciler,
    onchain: &dyn OnChainClient,
    exchange: &dyn ExchangeClient,
    market: &Market,
    token_id: &TokenId,
    mid: Decimal,
) -> Result<()> {
    if mid < DECIDED_HIGH && mid > DECIDED_LOW {
        return Ok(());
    }
    let market_slug = market.market_slug().clone();
    if state.supervisor().is_game_decided(&market_slug) {
        return Ok(());
    }

    let winning_token_id = if mid >= DECIDED_HIGH {
        token_id.clone()
    } else {
        market.complement_of(token_id).cloned().unwrap_or_else(|| token_id.clone())
    };

    terminate_market(state, reconciler, onchain, exchange, &market_slug, &winning_token_id).await
}

/// Cancel every resting order on the market, close every open position at
/// its terminal value, merge whatever balanced inventory remains, and free
/// the market's book and inventory entry. Idempotent per market: the
/// decided flag is set first so a racing tick can't re-enter.
async fn terminate_market(
    state: &AppState,
    reconciler: &mut FillReconciler,
    onchain: &dyn OnChainClient,
    exchange: &dyn ExchangeClient,
    market_slug: &crate::core::domain::MarketSlug,
    winning_token_id: &TokenId,
) -> Result<()> {
    state.supervisor_mut().mark_game_decided(market_slug.clone());
    warn!(market = %market_slug, winner = %winning_token_id, "game decided, terminating every open cycle");

    let now = chrono::Utc::now();
    let shock_ids: Vec<crate::core::domain::ShockId> = {
        let supervisor = state.supervisor();
        let Some(book) = supervisor.book(market_slug) else { return Ok(()) };
        book.active_shock_ids().into_iter().collect()
    };

    for shock_id in shock_ids {
        let outcome = {
            let mut supervisor = state.supervisor_mut();
            let book = supervisor.book_mut(market_slug);
            let held_token_id = book
                .cumulative_tp(&shock_id)
                .map(|tp| tp.held_token_id.clone())
                .or_else(|| book.positions_for(&shock_id).first().map(|p| p.held_token_id.clone()));
            let Some(held_token_id) = held_token_id else { continue };
            let exit_price = if &held_token_id == winning_token_id { Decimal::ONE } else { Decimal::ZERO };
            let outcome = book.terminate(&shock_id, exit_price, ExitReason::GameDecided, now);
            for record in &outcome.trade_records {
                supervisor.record_trade(record);
            }
            outcome
        };

        for cancelled in &outcome.cancelled_orders {
            if let Some(id) = &cancelled.exchange_order_id {
                reconciler.note_cancel_requested(id.clone(), OrderRole::Ladder(cancelled.local_id));
                let _ = exchange.cancel(id).await;
                state.supervisor_mut().forget_order(id);
            }
        }
        if let Some(id) = &outcome.cancelled_tp_exchange_order_id {
            reconciler.note_cancel_requested(id.clone(), OrderRole::TakeProfit(shock_id.clone()));
            let _ = exchange.cancel(id).await;
            state.supervisor_mut().forget_order(id);
        }

        return_cancelled_shares(state, market_slug, &outcome.returned_shares);
    }

    settle_inventory(state, onchain, market_slug).await;

    Ok(())
}

fn return_cancelled_shares(state: &AppState, market_slug: &crate::core::domain::MarketSlug, returned: &[crate::core::cycle::ReturnedShares]) {
    if returned.is_empty() {
        return;
    }
    let markets = state.markets();
    let mut supervisor = state.supervisor_mut();
    for r in returned {
        let is_token_a = markets.market_for_token(&r.token_id).map(|m| markets.is_token_a(m, &r.token_id)).unwrap_or(true);
        let _ = supervisor.inventory_mut().return_sell_side(market_slug, is_token_a, r.shares);
    }
}

/// Merge back whatever balanced inventory is left, then free the market's
/// book and inventory entry. Unbalanced residual shares are logged only —
/// they redeem on settlement with no action this process takes.
async fn settle_inventory(state: &AppState, onchain: &dyn OnChainClient, market_slug: &crate::core::domain::MarketSlug) {
    let (mergeable, condition_id, tier_flag) = {
        let supervisor = state.supervisor();
        let Some(inventory) = supervisor.inventory().get(market_slug) else {
            return;
        };
        (supervisor.inventory().mergeable(market_slug), inventory.condition_id.clone(), inventory.tier_flag)
    };

    if mergeable > 0 {
        match onchain.merge(condition_id.as_str(), mergeable, tier_flag).await {
            Ok(_) => {
                let _ = state.supervisor_mut().inventory_mut().apply_merge(market_slug, mergeable);
            }
            Err(err) => warn!(market = %market_slug, error = %err, "game-decided merge failed, balanced shares left unmerged"),
        }
    }

    let residual = state.supervisor().inventory().get(market_slug).map(|inv| {
        let balanced = inv.shares_a.min(inv.shares_b);
        (inv.shares_a - balanced) + (inv.shares_b - balanced)
    });
    if let Some(residual) = residual {
        if residual > 0 {
            info!(market = %market_slug, residual_shares = residual, "unbalanced residual left redeemable at settlement");
        }
    }

    let mut supervisor = state.supervisor_mut();
    supervisor.inventory_mut().remove(market_slug);
    supervisor.remove_book(market_slug);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{ConditionId, LifecycleState, MarketSlug, PriceTierFlag};
    use crate::core::exchange::{OpenOrderSummary, OrderDetails, PlacementResult, TxHash};
    use crate::core::supervisor::{RiskConfig, RuntimeConfig};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubOnChain {
        merge_calls: AtomicUsize,
    }

    #[async_trait]
    impl OnChainClient for StubOnChain {
        async fn split(&self, _condition_id: &str, _amount: Decimal, _tier_flag: PriceTierFlag) -> Result<TxHash> {
            Ok(TxHash("split-tx".to_string()))
        }

        async fn merge(&self, _condition_id: &str, _shares: u64, _tier_flag: PriceTierFlag) -> Result<TxHash> {
            self.merge_calls.fetch_add(1, Ordering::SeqCst);
            Ok(TxHash("merge-tx".to_string()))
        }
    }

    #[derive(Default)]
    struct StubExchange {
        cancels: Mutex<Vec<crate::core::domain::ExchangeOrderId>>,
    }

    #[async_trait]
    impl ExchangeClient for StubExchange {
        async fn place_sell_limit_gtc(&self, token_id: &TokenId, shares: u64, price: Decimal, _tier_flag: PriceTierFlag) -> Result<PlacementResult> {
            Ok(PlacementResult { order_id: crate::core::domain::ExchangeOrderId::new(format!("close-{token_id}-{shares}-{price}")), filled_shares: 0, filled_price: None })
        }
        async fn cancel(&self, order_id: &crate::core::domain::ExchangeOrderId) -> Result<()> {
            self.cancels.lock().unwrap().push(order_id.clone());
            Ok(())
        }
        async fn open_orders(&self, _condition_id: &str) -> Result<Vec<OpenOrderSummary>> {
            Ok(vec![])
        }
        async fn order(&self, order_id: &crate::core::domain::ExchangeOrderId) -> Result<OrderDetails> {
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
        RuntimeConfig {
            detector: crate::core::detector::DetectorConfig::default(),
            sizing: crate::core::inventory::SizingConfig { ladder_sizes: vec![5, 10], max_cycles_per_game: 3, max_concurrent_games: 3 },
            risk: RiskConfig::default(),
            sell_price_max: dec!(0.85),
            late_game_sell_price_max: dec!(0.70),
            ladder_spacing: dec!(0.03),
            fade_target: dec!(0.03),
        }
    }

    fn market() -> Market {
        Market::new(
            MarketSlug::from("m"),
            ConditionId::from("c"),
            TokenId::from("token-a"),
            TokenId::from("token-b"),
            "A",
            "B",
            PriceTierFlag::Standard,
            LifecycleState::Active,
        )
    }

    fn setup() -> AppState {
        let state = AppState::new(runtime_config(), chrono::Utc::now());
        state.markets_mut().replace(vec![market()]);
        let _ = state.supervisor_mut().inventory_mut().create_or_top_up(
            MarketSlug::from("m"),
            ConditionId::from("c"),
            PriceTierFlag::Standard,
            50,
            dec!(50.0),
            &runtime_config().sizing,
        );
        state
    }

    #[tokio::test]
    async fn token_a_mid_at_one_marks_token_a_as_winner_and_closes_positions() {
        let state = setup();
        let shock_id = crate::core::domain::ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000);
        {
            let mut supervisor = state.supervisor_mut();
            supervisor.inventory_mut().consume_sell_side(&MarketSlug::from("m"), &TokenId::from("token-b"), false, 10).unwrap();
            let local_id = supervisor.book_mut(&MarketSlug::from("m")).next_local_order_id();
            supervisor.book_mut(&MarketSlug::from("m")).insert_pending_order(crate::core::domain::LadderOrder::new(
                local_id,
                TokenId::from("token-b"),
                MarketSlug::from("m"),
                dec!(0.61),
                10,
                1,
                shock_id.clone(),
                Some("GSW".to_string()),
                chrono::Utc::now(),
            ));
            supervisor.book_mut(&MarketSlug::from("m")).mark_resting(local_id, crate::core::domain::ExchangeOrderId::new("ex-1"));
            supervisor.book_mut(&MarketSlug::from("m")).apply_entry_fill(
                local_id,
                10,
                dec!(0.61),
                ConditionId::from("c"),
                PriceTierFlag::Standard,
                Some("GSW".to_string()),
                TokenId::from("token-a"),
                dec!(0.03),
                chrono::Utc::now(),
            );
        }

        let onchain = StubOnChain { merge_calls: AtomicUsize::new(0) };
        let exchange = StubExchange::default();
        let mut reconciler = FillReconciler::new();
        check_tick(&state, &mut reconciler, &onchain, &exchange, &market(), &TokenId::from("token-a"), dec!(0.995)).await.unwrap();

        assert!(state.supervisor().is_game_decided(&MarketSlug::from("m")));
        assert!(state.supervisor().book(&MarketSlug::from("m")).is_none());
        assert!(state.supervisor().inventory().get(&MarketSlug::from("m")).is_none());
        let trades = state.supervisor().trade_log();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_price, Decimal::ONE);
        assert_eq!(exchange.cancels.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mid_inside_the_band_does_not_decide_the_game() {
        let state = setup();
        let onchain = StubOnChain { merge_calls: AtomicUsize::new(0) };
        let exchange = StubExchange::default();
        let mut reconciler = FillReconciler::new();
        check_tick(&state, &mut reconciler, &onchain, &exchange, &market(), &TokenId::from("token-a"), dec!(0.70)).await.unwrap();
        assert!(!state.supervisor().is_game_decided(&MarketSlug::from("m")));
    }

    #[tokio::test]
    async fn already_decided_market_is_not_reprocessed() {
        let state = setup();
        state.supervisor_mut().mark_game_decided(MarketSlug::from("m"));
        let onchain = StubOnChain { merge_calls: AtomicUsize::new(0) };
        let exchange = StubExchange::default();
        let mut reconciler = FillReconciler::new();
        check_tick(&state, &mut reconciler, &onchain, &exchange, &market(), &TokenId::from("token-a"), dec!(0.995)).await.unwrap();
        assert_eq!(onchain.merge_calls.load(Ordering::SeqCst), 0);
    }
}
