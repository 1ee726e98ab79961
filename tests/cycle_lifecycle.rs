//! End-to-end exercises of the cycle engine through the public orchestrator
//! entry points, using the `testkit` scripted ports instead of a live
//! exchange connection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use shockfade::app::orchestrator::{poll_and_classify, process_tick, reconcile_fill};
use shockfade::app::state::AppState;
use shockfade::core::classifier::{ClassifierConfig, EventClassifier, ScoringEvent};
use shockfade::core::detector::{DetectorConfig, ShockDetector};
use shockfade::core::domain::{
    ConditionId, ExchangeOrderId, LadderOrder, LifecycleState, MarketSlug, PriceTierFlag, ShockId, TokenId,
};
use shockfade::core::domain::{LocalOrderId, Market};
use shockfade::core::exchange::{BookTick, FillEvent, FillKind};
use shockfade::core::inventory::SizingConfig;
use shockfade::core::reconciliation::FillReconciler;
use shockfade::core::supervisor::{RiskConfig, RuntimeConfig};
use shockfade::testkit::{MockExchangeClient, MockOrderbookFeed};

fn started_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn runtime_config() -> RuntimeConfig {
    RuntimeConfig {
        detector: DetectorConfig::default(),
        sizing: SizingConfig { ladder_sizes: vec![5, 10, 15], max_cycles_per_game: 3, max_concurrent_games: 3 },
        risk: RiskConfig::default(),
        sell_price_max: dec!(0.85),
        late_game_sell_price_max: dec!(0.70),
        ladder_spacing: dec!(0.03),
        fade_target: dec!(0.03),
    }
}

fn market(slug: &str) -> Market {
    Market::new(
        MarketSlug::from(slug),
        ConditionId::from("c"),
        TokenId::from("token-a"),
        TokenId::from("token-b"),
        "A",
        "B",
        PriceTierFlag::Standard,
        LifecycleState::Active,
    )
}

fn bootstrap(slug: &str, shares_per_side: u64) -> AppState {
    let state = AppState::new(runtime_config(), started_at());
    state.markets_mut().replace(vec![market(slug)]);
    state
        .supervisor_mut()
        .inventory_mut()
        .create_or_top_up(
            MarketSlug::from(slug),
            ConditionId::from("c"),
            PriceTierFlag::Standard,
            shares_per_side,
            Decimal::from(shares_per_side),
            &runtime_config().sizing,
        )
        .unwrap();
    state
}

/// Insert a resting ladder order directly on a market's book, bypassing the
/// detector/classifier/placement pipeline, for tests that only care about
/// what happens once a cycle is already open.
fn seed_resting_ladder(state: &AppState, slug: &str, shock_id: ShockId, team: &str, exchange_order_id: &str, price: Decimal, shares: u64) -> LocalOrderId {
    let market_slug = MarketSlug::from(slug);
    let mut supervisor = state.supervisor_mut();
    let local_id = supervisor.book_mut(&market_slug).next_local_order_id();
    supervisor.book_mut(&market_slug).insert_pending_order(LadderOrder::new(
        local_id,
        TokenId::from("token-a"),
        market_slug.clone(),
        price,
        shares,
        1,
        shock_id,
        Some(team.to_string()),
        started_at(),
    ));
    supervisor.book_mut(&market_slug).mark_resting(local_id, ExchangeOrderId::new(exchange_order_id));
    supervisor.register_order(ExchangeOrderId::new(exchange_order_id), market_slug);
    local_id
}

/// A ladder rung fills, the take-profit rests and then fills in full: the
/// cycle closes in profit and the session's running PnL reflects the $1
/// split cost basis (worked example: entry 0.61 + exit 0.42 - 1 = 0.03/share).
#[tokio::test]
async fn ladder_fill_then_full_tp_fill_closes_the_cycle_in_profit() {
    let state = bootstrap("m", 30);
    let mut reconciler = FillReconciler::new();
    let exchange = MockExchangeClient::new();

    let shock_id = ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000);
    seed_resting_ladder(&state, "m", shock_id.clone(), "GSW", "ex-1", dec!(0.61), 5);

    let entry = FillEvent { order_id: ExchangeOrderId::new("ex-1"), kind: FillKind::Matched, price: Some(dec!(0.61)), size: Some(5) };
    reconcile_fill(&state, &mut reconciler, &exchange, entry).await.unwrap();

    let tp_order_id = {
        let supervisor = state.supervisor();
        let book = supervisor.book(&MarketSlug::from("m")).unwrap();
        let tp = book.cumulative_tp(&shock_id).unwrap();
        assert_eq!(tp.tp_price, dec!(0.42));
        tp.tp_exchange_order_id.clone().unwrap()
    };

    let tp_fill = FillEvent { order_id: tp_order_id, kind: FillKind::Matched, price: Some(dec!(0.42)), size: Some(5) };
    reconcile_fill(&state, &mut reconciler, &exchange, tp_fill).await.unwrap();

    let supervisor = state.supervisor();
    assert!(supervisor.book(&MarketSlug::from("m")).unwrap().cumulative_tp(&shock_id).is_none());
    let trades = supervisor.trade_log();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].realized_pnl, dec!(0.15));
    assert_eq!(supervisor.state().session_pnl, dec!(0.15));
}

/// A partial ladder fill followed by a second fill at a worse price re-rests
/// the take-profit at the new blended price and size.
#[tokio::test]
async fn second_ladder_fill_re_rests_the_take_profit_at_the_blended_price() {
    let state = bootstrap("m", 30);
    let mut reconciler = FillReconciler::new();
    let exchange = MockExchangeClient::new();

    let shock_id = ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000);
    seed_resting_ladder(&state, "m", shock_id.clone(), "GSW", "ex-1", dec!(0.61), 5);
    seed_resting_ladder(&state, "m", shock_id.clone(), "GSW", "ex-2", dec!(0.64), 10);

    let fill_one = FillEvent { order_id: ExchangeOrderId::new("ex-1"), kind: FillKind::Matched, price: Some(dec!(0.61)), size: Some(5) };
    reconcile_fill(&state, &mut reconciler, &exchange, fill_one).await.unwrap();
    let fill_two = FillEvent { order_id: ExchangeOrderId::new("ex-2"), kind: FillKind::Matched, price: Some(dec!(0.64)), size: Some(10) };
    reconcile_fill(&state, &mut reconciler, &exchange, fill_two).await.unwrap();

    let supervisor = state.supervisor();
    let book = supervisor.book(&MarketSlug::from("m")).unwrap();
    let tp = book.cumulative_tp(&shock_id).unwrap();
    assert_eq!(tp.blended_entry_price, dec!(0.63));
    assert_eq!(tp.tp_shares, 15);
    assert_eq!(exchange.placements().iter().filter(|(token, ..)| token.as_str() == "token-b").count(), 2);
}

/// An adverse scoring event against two open cycles on the same market
/// flattens both held positions in a single combined order, not two
/// separate ones.
#[tokio::test]
async fn adverse_event_closes_two_open_cycles_in_one_combined_order() {
    let state = bootstrap("m", 30);
    let mut reconciler = FillReconciler::new();
    let exchange = MockExchangeClient::new();

    let shock_one = ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000);
    let shock_two = ShockId::new(&TokenId::from("token-a"), 1_700_000_000_500);
    seed_resting_ladder(&state, "m", shock_one.clone(), "GSW", "ex-1", dec!(0.61), 5);
    seed_resting_ladder(&state, "m", shock_two.clone(), "GSW", "ex-2", dec!(0.64), 10);

    for (order, shares, price) in [("ex-1", 5u64, dec!(0.61)), ("ex-2", 10u64, dec!(0.64))] {
        let fill = FillEvent { order_id: ExchangeOrderId::new(order), kind: FillKind::Matched, price: Some(price), size: Some(shares) };
        reconcile_fill(&state, &mut reconciler, &exchange, fill).await.unwrap();
    }

    exchange.force_next_fill(15, dec!(0.30));
    let orderbook = MockOrderbookFeed::new();
    orderbook.set_best_bid(TokenId::from("token-b"), dec!(0.30));
    let event_feed = shockfade::testkit::MockEventFeedAdapter::new();
    event_feed.queue(
        "m",
        vec![ScoringEvent {
            game_id: "m".to_string(),
            event_type: "scoring_play".to_string(),
            team: "GSW".to_string(),
            period: "Q3".to_string(),
            clock: "8:00".to_string(),
            timestamp: started_at(),
        }],
    );

    let mut detector = ShockDetector::new(DetectorConfig::default());
    let mut classifier = EventClassifier::new(ClassifierConfig::default());
    let mut pending_shocks = std::collections::HashMap::new();

    poll_and_classify(&state, &mut detector, &mut classifier, &mut pending_shocks, &mut reconciler, &event_feed, &exchange, &orderbook, started_at())
        .await
        .unwrap();

    let supervisor = state.supervisor();
    let book = supervisor.book(&MarketSlug::from("m")).unwrap();
    assert!(book.cumulative_tp(&shock_one).is_none());
    assert!(book.cumulative_tp(&shock_two).is_none());
    assert_eq!(supervisor.trade_log().len(), 2);

    let close_placements: Vec<_> = exchange.placements().into_iter().filter(|(token, ..)| token.as_str() == "token-b").collect();
    assert_eq!(close_placements.len(), 1, "both cycles' held positions should flatten in a single combined order");
    assert_eq!(close_placements[0].1, 15);
}

/// A cancelled take-profit order that races a push fill is still applied as a
/// fill, reopening the cycle's accounting rather than being silently dropped.
#[tokio::test]
async fn cancel_fill_race_on_a_take_profit_order_still_applies_the_fill() {
    let state = bootstrap("m", 30);
    let mut reconciler = FillReconciler::new();
    let exchange = MockExchangeClient::new();

    let shock_id = ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000);
    seed_resting_ladder(&state, "m", shock_id.clone(), "GSW", "ex-1", dec!(0.61), 5);
    let entry = FillEvent { order_id: ExchangeOrderId::new("ex-1"), kind: FillKind::Matched, price: Some(dec!(0.61)), size: Some(5) };
    reconcile_fill(&state, &mut reconciler, &exchange, entry).await.unwrap();

    let old_tp_order_id = {
        let supervisor = state.supervisor();
        supervisor.book(&MarketSlug::from("m")).unwrap().cumulative_tp(&shock_id).unwrap().tp_exchange_order_id.clone().unwrap()
    };

    // Simulate the orchestrator cancelling and replacing the TP (as a fresh
    // entry fill would) by directly arming the reconciler the way
    // `place_or_replace_tp` does, without actually moving the TP's price.
    reconciler.note_cancel_requested(old_tp_order_id.clone(), shockfade::core::cycle::OrderRole::TakeProfit(shock_id.clone()));
    state.supervisor_mut().forget_order(&old_tp_order_id);

    // The exchange's cancel lost the race: a fill for the now-forgotten order
    // id arrives anyway.
    let late_fill = FillEvent { order_id: old_tp_order_id, kind: FillKind::Matched, price: Some(dec!(0.42)), size: Some(5) };
    reconcile_fill(&state, &mut reconciler, &exchange, late_fill).await.unwrap();

    let supervisor = state.supervisor();
    assert!(supervisor.book(&MarketSlug::from("m")).unwrap().cumulative_tp(&shock_id).is_none());
    let trades = supervisor.trade_log();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].realized_pnl, dec!(0.15));
}

/// A price tick that moves past a market's decided threshold, with no open
/// cycles yet, is a no-op through `process_tick`'s game-decided check — the
/// market only tears down once something is actually open on it.
#[tokio::test]
async fn process_tick_with_no_open_cycles_does_not_panic() {
    let state = bootstrap("m", 30);
    let mut detector = ShockDetector::new(DetectorConfig::default());
    let mut classifier = EventClassifier::new(ClassifierConfig::default());
    let mut pending_shocks = std::collections::HashMap::new();
    let mut reconciler = FillReconciler::new();
    let exchange = MockExchangeClient::new();
    let onchain = shockfade::testkit::MockOnChainClient::new();

    let tick = BookTick { token_id: TokenId::from("token-a"), bid: dec!(0.58), ask: dec!(0.60), timestamp: started_at() };
    process_tick(&state, &mut detector, &mut classifier, &mut pending_shocks, &mut reconciler, &onchain, &exchange, tick).await.unwrap();

    assert!(!state.supervisor().is_game_decided(&MarketSlug::from("m")));
}
