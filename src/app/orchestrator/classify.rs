//! Periodic classifier drive: polls each active market's scoring-event feed,
//! routes live cycles against newly-seen events, and resolves pending shocks
//! into ladder placement (or a drop) once the classifier has enough signal.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::classifier::{Classification, EventClassifier};
use crate::core::cycle::acceptance::{self, AcceptanceContext};
use crate::core::cycle::exit::{route_event, EventDecision};
use crate::core::cycle::ladder;
use crate::core::cycle::OrderRole;
use crate::core::detector::ShockDetector;
use crate::core::domain::{ExitReason, LadderOrder, Shock};
use crate::core::exchange::{EventFeedAdapter, ExchangeClient, OrderbookFeed};
use crate::core::executor::CloseRequest;
use crate::core::reconciliation::FillReconciler;
use crate::core::supervisor::Supervisor;
use crate::error::Result;

use super::exit::{close_batch, close_one};
use crate::app::state::AppState;

/// Markets the classifier poll needs to visit this round: anything with a
/// pending shock, and anything with a book at all (an open cycle can still
/// need event routing even after its shock has already classified).
fn markets_to_poll(classifier: &EventClassifier, supervisor: &Supervisor) -> HashSet<crate::core::domain::MarketSlug> {
    let mut markets = classifier.markets_with_pending_shocks();
    markets.extend(supervisor.market_slugs().cloned());
    markets
}

#[allow(clippy::too_many_arguments)]
pub async fn poll_and_classify(
    state: &AppState,
    detector: &mut ShockDetector,
    classifier: &mut EventClassifier,
    pending_shocks: &mut HashMap<String, Shock>,
    reconciler: &mut FillReconciler,
    event_feed: &dyn EventFeedAdapter,
    exchange: &dyn ExchangeClient,
    orderbook: &dyn OrderbookFeed,
    now: DateTime<Utc>,
) -> Result<()> {
    let markets = {
        let supervisor = state.supervisor();
        markets_to_poll(classifier, &supervisor)
    };

    for market_slug in markets {
        if state.supervisor().is_game_decided(&market_slug) {
            continue;
        }

        let events = event_feed.poll(market_slug.as_str()).await?;
        for event in &events {
            classifier.record_event(market_slug.clone(), event.clone(), now);
        }

        route_open_cycles_against_events(state, reconciler, exchange, orderbook, &market_slug, &events, now).await?;

        if let Some(team) = classifier.same_team_run(&market_slug) {
            bail_scoring_run(state, reconciler, exchange, orderbook, &market_slug, &team, now).await?;
        }

        for shock_id in classifier.pending_shock_ids_for(&market_slug) {
            let Some(classification) = classifier.classify(&shock_id, now) else {
                continue;
            };
            let Some(shock) = pending_shocks.remove(&shock_id) else {
                continue;
            };

            match classification {
                Classification::SingleEvent { team } => {
                    place_ladder_if_accepted(state, reconciler, exchange, classifier, &market_slug, shock, team, now).await?;
                }
                Classification::ScoringRun => {
                    info!(market = %market_slug, shock = %shock_id, "shock classified as a scoring run, dropping");
                }
                Classification::Unclassified => {
                    info!(market = %market_slug, shock = %shock_id, "shock left unclassified at the deadline, dropping");
                    detector.reset_cooldown(&market_slug);
                }
            }
        }

        if classifier.pending_shock_ids_for(&market_slug).is_empty() {
            let still_open = state.supervisor().book(&market_slug).map(|b| b.active_cycle_count() > 0).unwrap_or(false);
            if !still_open {
                classifier.deactivate(&market_slug);
            }
        }
    }

    Ok(())
}

/// Walk every open cumulative TP in `market_slug`'s book and exit the ones a
/// newly-seen event turns adverse or ambiguous, flattening every affected
/// cycle's held position in a single combined order.
async fn route_open_cycles_against_events(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    orderbook: &dyn OrderbookFeed,
    market_slug: &crate::core::domain::MarketSlug,
    events: &[crate::core::classifier::ScoringEvent],
    now: DateTime<Utc>,
) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    let last_event = &events[events.len() - 1];

    let shock_ids: Vec<crate::core::domain::ShockId> = {
        let supervisor = state.supervisor();
        let Some(book) = supervisor.book(market_slug) else { return Ok(()) };
        book.all_cumulative_tps().map(|tp| tp.shock_id.clone()).collect()
    };

    let mut requests = Vec::new();
    for shock_id in shock_ids {
        let shock_team = {
            let supervisor = state.supervisor();
            supervisor.book(market_slug).and_then(|b| b.cumulative_tp(&shock_id)).and_then(|tp| tp.shock_team.clone())
        };
        let decision = route_event(shock_team.as_deref(), Some(last_event.team.as_str()));
        if matches!(decision, EventDecision::Favorable) {
            continue;
        }
        if let Some(request) = terminate_cycle(state, reconciler, exchange, market_slug, &shock_id, ExitReason::EventExit, now).await {
            requests.push(request);
        }
    }
    if !requests.is_empty() {
        let _ = close_batch(exchange, orderbook, &requests).await;
    }
    Ok(())
}

/// Two same-team events in the window: bail every open cycle in the market,
/// regardless of individual team attribution — the game has turned. Every
/// bailed cycle's held position is flattened in one combined order.
async fn bail_scoring_run(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    orderbook: &dyn OrderbookFeed,
    market_slug: &crate::core::domain::MarketSlug,
    team: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let shock_ids: Vec<crate::core::domain::ShockId> = {
        let supervisor = state.supervisor();
        let Some(book) = supervisor.book(market_slug) else { return Ok(()) };
        book.all_cumulative_tps().map(|tp| tp.shock_id.clone()).collect()
    };
    if shock_ids.is_empty() {
        return Ok(());
    }
    warn!(market = %market_slug, %team, "scoring run detected, bailing every open cycle");

    let mut requests = Vec::new();
    for shock_id in shock_ids {
        if let Some(request) = terminate_cycle(state, reconciler, exchange, market_slug, &shock_id, ExitReason::ScoringRunBail, now).await {
            requests.push(request);
        }
    }
    if !requests.is_empty() {
        let _ = close_batch(exchange, orderbook, &requests).await;
    }
    Ok(())
}

/// Tear down one cycle's bookkeeping: cancel its resting ladder and TP
/// orders at the exchange (arming the reconciler against a cancel-fill race
/// on each before forgetting its role), return its ladder inventory, and
/// record the trade(s). Returns the close request the caller must flatten at
/// the exchange for this shock's remaining held position, if any.
async fn terminate_cycle(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    market_slug: &crate::core::domain::MarketSlug,
    shock_id: &crate::core::domain::ShockId,
    reason: ExitReason,
    now: DateTime<Utc>,
) -> Option<CloseRequest> {
    let outcome = {
        let mut supervisor = state.supervisor_mut();
        // exit_price is provisional; the real fill price is applied to the
        // trade record's economics once the close order reports back. Mid
        // isn't available here, so terminate records the exit at the
        // cycle's current TP price as a best estimate.
        let exit_price = supervisor
            .book(market_slug)
            .and_then(|b| b.cumulative_tp(shock_id))
            .map(|tp| tp.tp_price)
            .unwrap_or(rust_decimal_macros::dec!(0.50));
        let outcome = supervisor.book_mut(market_slug).terminate(shock_id, exit_price, reason, now);
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

    return_ladder_shares(state, market_slug, &outcome.returned_shares);

    let held_token_id = outcome.held_token_id?;
    let positions_shares: u64 = {
        let supervisor = state.supervisor();
        supervisor.book(market_slug).map_or(0, |b| b.positions_for(shock_id).iter().map(|p| p.remaining_shares()).sum())
    };
    if positions_shares == 0 {
        return None;
    }
    let tier_flag = state.supervisor().inventory().get(market_slug).map(|inv| inv.tier_flag).unwrap_or_default();
    Some(CloseRequest { held_token_id, shares: positions_shares, tier_flag })
}

/// Public entry point for the emergency-timeout sweep: tear down one cycle
/// whose oldest position has outrun the configured timeout.
pub async fn close_cycle_for_timeout(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    orderbook: &dyn OrderbookFeed,
    market_slug: &crate::core::domain::MarketSlug,
    shock_id: &crate::core::domain::ShockId,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(request) = terminate_cycle(state, reconciler, exchange, market_slug, shock_id, ExitReason::EmergencyTimeout, now).await {
        let _ = close_one(exchange, orderbook, &request).await;
    }
    Ok(())
}

fn return_ladder_shares(state: &AppState, market_slug: &crate::core::domain::MarketSlug, returned: &[crate::core::cycle::ReturnedShares]) {
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

/// Run the acceptance gate for a newly-classified single-event shock and, if
/// it passes, place its full ladder.
#[allow(clippy::too_many_arguments)]
async fn place_ladder_if_accepted(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    classifier: &EventClassifier,
    market_slug: &crate::core::domain::MarketSlug,
    shock: Shock,
    team: String,
    now: DateTime<Utc>,
) -> Result<()> {
    let market = {
        let markets = state.markets();
        let Some(market) = markets.market_for_token(&shock.token_id) else {
            return Ok(());
        };
        market.clone()
    };
    let Some(sell_token_id) = shock.sell_token_id(&market) else {
        return Ok(());
    };
    let is_token_a = { state.markets().is_token_a(&market, &sell_token_id) };

    let late_game = classifier
        .latest_event(market_slug)
        .is_some_and(|event| acceptance::is_late_game(&event.period, &event.clock));

    let ctx = {
        let supervisor = state.supervisor();
        let config = supervisor.config();
        let active_cycle_count = supervisor.book(market_slug).map(|b| b.active_cycle_count()).unwrap_or(0);
        let has_inventory = supervisor
            .inventory()
            .get(market_slug)
            .map(|inv| if is_token_a { inv.shares_a } else { inv.shares_b } >= config.sizing.cycle_size())
            .unwrap_or(false);
        AcceptanceContext {
            halted: supervisor.is_halted(),
            active_cycle_count,
            max_cycles_per_game: config.sizing.max_cycles_per_game,
            sell_token_price: shock.sell_token_price(),
            late_game,
            sell_price_max: config.sell_price_max,
            late_game_sell_price_max: config.late_game_sell_price_max,
            has_inventory,
        }
    };

    if let Err(reason) = acceptance::evaluate(&ctx) {
        info!(market = %market_slug, ?reason, "shock rejected at acceptance gate");
        return Ok(());
    }

    let (ladder_sizes, spacing, fade_target, condition_id, tier_flag) = {
        let supervisor = state.supervisor();
        let config = supervisor.config();
        let inventory = supervisor.inventory().get(market_slug);
        (
            config.sizing.ladder_sizes.clone(),
            config.ladder_spacing,
            config.fade_target,
            inventory.map(|i| i.condition_id.clone()),
            inventory.map(|i| i.tier_flag).unwrap_or_default(),
        )
    };
    let Some(condition_id) = condition_id else {
        warn!(market = %market_slug, "accepted shock but no inventory entry exists, dropping");
        return Ok(());
    };

    let plan = ladder::build_plan(shock.sell_token_price(), &ladder_sizes, spacing);
    let shock_id = shock.shock_id();

    for level in plan {
        {
            let mut supervisor = state.supervisor_mut();
            if supervisor.inventory_mut().consume_sell_side(market_slug, &sell_token_id, is_token_a, level.shares).is_err() {
                continue;
            }
        }

        let placement = match exchange.place_sell_limit_gtc(&sell_token_id, level.shares, level.price, tier_flag).await {
            Ok(placement) => placement,
            Err(err) => {
                warn!(market = %market_slug, level = level.level, error = %err, "ladder placement failed, returning shares");
                let mut supervisor = state.supervisor_mut();
                let _ = supervisor.inventory_mut().return_sell_side(market_slug, is_token_a, level.shares);
                continue;
            }
        };

        let mut supervisor = state.supervisor_mut();
        let local_id = supervisor.book_mut(market_slug).next_local_order_id();
        supervisor.book_mut(market_slug).insert_pending_order(LadderOrder::new(
            local_id,
            sell_token_id.clone(),
            market_slug.clone(),
            level.price,
            level.shares,
            level.level,
            shock_id.clone(),
            Some(team.clone()),
            now,
        ));
        supervisor.book_mut(market_slug).mark_resting(local_id, placement.order_id.clone());
        supervisor.register_order(placement.order_id.clone(), market_slug.clone());
        drop(supervisor);

        if placement.filled_shares > 0 {
            if let Some(price) = placement.filled_price {
                let held_token_id = market.complement_of(&sell_token_id).cloned().unwrap_or_else(|| sell_token_id.clone());
                {
                    let mut supervisor = state.supervisor_mut();
                    supervisor.book_mut(market_slug).apply_entry_fill(
                        local_id,
                        placement.filled_shares,
                        price,
                        condition_id.clone(),
                        tier_flag,
                        Some(team.clone()),
                        held_token_id.clone(),
                        fade_target,
                        now,
                    );
                    let _ = supervisor.inventory_mut().consume_sell_side(market_slug, &held_token_id, !is_token_a, placement.filled_shares);
                }
                if let Err(err) = super::tp::place_or_replace_tp(state, reconciler, exchange, market_slug, &shock_id).await {
                    warn!(market = %market_slug, %shock_id, error = %err, "take-profit placement failed after immediate ladder fill");
                }
            }
        }
    }

    Ok(())
}
