//! Cancel-and-replace take-profit placement: every time a cycle's cost basis
//! moves (a fresh entry fill), the resting TP is torn down and re-rested at
//! the freshly-blended price and size. The engine never amends a resting
//! order in place.

use tracing::warn;

use crate::app::state::AppState;
use crate::core::cycle::OrderRole;
use crate::core::domain::{MarketSlug, ShockId};
use crate::core::exchange::ExchangeClient;
use crate::core::reconciliation::FillReconciler;
use crate::error::Result;

/// Cancel the cycle's current resting TP (if any) and rest a fresh one sized
/// to the cycle's current `tp_shares`/`tp_price`. A zero `tp_shares` (the
/// cycle already hit its TP) is a no-op.
pub async fn place_or_replace_tp(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    market_slug: &MarketSlug,
    shock_id: &ShockId,
) -> Result<()> {
    let (held_token_id, tp_price, tp_shares, tier_flag, old_order_id) = {
        let supervisor = state.supervisor();
        let Some(book) = supervisor.book(market_slug) else { return Ok(()) };
        let Some(tp) = book.cumulative_tp(shock_id) else { return Ok(()) };
        if tp.tp_shares == 0 {
            return Ok(());
        }
        (tp.held_token_id.clone(), tp.tp_price, tp.tp_shares, tp.tier_flag, tp.tp_exchange_order_id.clone())
    };

    if let Some(old_id) = &old_order_id {
        reconciler.note_cancel_requested(old_id.clone(), OrderRole::TakeProfit(shock_id.clone()));
        let _ = exchange.cancel(old_id).await;
        state.supervisor_mut().forget_order(old_id);
    }

    let placement = match exchange.place_sell_limit_gtc(&held_token_id, tp_shares, tp_price, tier_flag).await {
        Ok(placement) => placement,
        Err(err) => {
            warn!(market = %market_slug, %shock_id, error = %err, "take-profit replacement failed, cycle left without a resting tp until next fill");
            let mut supervisor = state.supervisor_mut();
            supervisor.book_mut(market_slug).set_tp_exchange_order_id(shock_id, None);
            return Err(err);
        }
    };

    {
        let mut supervisor = state.supervisor_mut();
        supervisor.book_mut(market_slug).set_tp_exchange_order_id(shock_id, Some(placement.order_id.clone()));
        supervisor.register_order(placement.order_id.clone(), market_slug.clone());
    }

    if placement.filled_shares > 0 {
        if let Some(price) = placement.filled_price {
            finish_tp_fill(state, reconciler, exchange, market_slug, shock_id, placement.filled_shares, price).await?;
        }
    }

    Ok(())
}

/// Apply a take-profit fill (from an immediate placement-time fill, a push
/// event or a poll disappearance) and, if it fully hits, tear the cycle down.
pub async fn finish_tp_fill(
    state: &AppState,
    reconciler: &mut FillReconciler,
    exchange: &dyn ExchangeClient,
    market_slug: &MarketSlug,
    shock_id: &ShockId,
    fill_shares: u64,
    fill_price: rust_decimal::Decimal,
) -> Result<()> {
    let now = chrono::Utc::now();
    let outcome = {
        let mut supervisor = state.supervisor_mut();
        let Some(outcome) = supervisor.book_mut(market_slug).apply_tp_fill(shock_id, fill_shares, fill_price, now) else {
            return Ok(());
        };
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

    if !outcome.returned_shares.is_empty() {
        let markets = state.markets();
        let mut supervisor = state.supervisor_mut();
        for r in &outcome.returned_shares {
            let is_token_a = markets.market_for_token(&r.token_id).map(|m| markets.is_token_a(m, &r.token_id)).unwrap_or(true);
            let _ = supervisor.inventory_mut().return_sell_side(market_slug, is_token_a, r.shares);
        }
    }

    Ok(())
}
