//! One orderbook tick, end to end: resolve the market, feed the detector, and
//! pend the resulting candidate on the classifier. Ladder placement itself
//! happens once the classifier resolves the pending shock — see
//! [`super::classify`].

use crate::app::state::AppState;
use crate::core::classifier::EventClassifier;
use crate::core::detector::ShockDetector;
use crate::core::domain::Shock;
use crate::core::exchange::{BookTick, ExchangeClient, OnChainClient};
use crate::core::reconciliation::FillReconciler;
use crate::error::Result;

#[allow(clippy::too_many_arguments)]
pub async fn process_tick(
    state: &AppState,
    detector: &mut ShockDetector,
    classifier: &mut EventClassifier,
    pending_shocks: &mut std::collections::HashMap<String, Shock>,
    reconciler: &mut FillReconciler,
    onchain: &dyn OnChainClient,
    exchange: &dyn ExchangeClient,
    tick: BookTick,
) -> Result<()> {
    let market = {
        let markets = state.markets();
        let Some(market) = markets.market_for_token(&tick.token_id) else {
            tracing::debug!(token = %tick.token_id, "tick for a token outside the discovered market set, dropping");
            return Ok(());
        };
        market.clone()
    };

    let mid = (tick.bid + tick.ask) / rust_decimal::Decimal::TWO;
    super::game_decided::check_tick(state, reconciler, onchain, exchange, &market, &tick.token_id, mid).await?;

    if state.supervisor().is_game_decided(market.market_slug()) {
        return Ok(());
    }

    let Some(shock) = detector.on_tick(&tick.token_id, market.market_slug(), tick.bid, tick.ask, tick.timestamp) else {
        return Ok(());
    };

    let spiked_outcome_name = market.outcome_name(&tick.token_id).unwrap_or_default().to_string();
    classifier.register_pending(shock.shock_id().as_str().to_string(), market.market_slug().clone(), spiked_outcome_name, tick.timestamp);
    classifier.activate(market.market_slug().clone());
    pending_shocks.insert(shock.shock_id().as_str().to_string(), shock);

    Ok(())
}
