//! Async driver for the GTC-at-bid exit algorithm: submits, polls, retries
//! and floors a sell order until the requested shares are gone or liquidity
//! runs out.

use rust_decimal_macros::dec;
use tracing::warn;

use crate::core::exchange::{ExchangeClient, OrderbookFeed};
use crate::core::executor::{attempt_price, classify_attempt, AttemptOutcome, CloseRequest};
use crate::error::Result;

/// Flatten one close request: quote at the bid, poll for a fill, and walk the
/// price down on each retry until either enough shares fill or the attempts
/// are exhausted and the order is floored at a cent.
pub async fn close_one(exchange: &dyn ExchangeClient, orderbook: &dyn OrderbookFeed, request: &CloseRequest) -> Result<u64> {
    if request.shares == 0 {
        return Ok(0);
    }

    let bid = orderbook.best_bid(&request.held_token_id).await?.unwrap_or_else(|| {
        warn!(token = %request.held_token_id, "no cached bid for exit, quoting at a cent");
        dec!(0.01)
    });

    let mut remaining = request.shares;
    let mut attempt: u8 = 0;

    loop {
        let price = if matches!(classify_attempt(request.shares, request.shares - remaining, attempt), AttemptOutcome::Floor) {
            dec!(0.01)
        } else {
            attempt_price(bid, attempt)
        };

        let placement = exchange.place_sell_limit_gtc(&request.held_token_id, remaining, price, request.tier_flag).await?;
        remaining = remaining.saturating_sub(placement.filled_shares);

        if remaining == 0 {
            return Ok(request.shares);
        }

        let filled_this_round = poll_for_fill(exchange, &placement.order_id, remaining).await?;
        remaining = remaining.saturating_sub(filled_this_round);

        if remaining == 0 {
            return Ok(request.shares);
        }

        let _ = exchange.cancel(&placement.order_id).await;

        match classify_attempt(request.shares, request.shares - remaining, attempt) {
            AttemptOutcome::ImmediateFill => return Ok(request.shares - remaining),
            AttemptOutcome::Retry => attempt += 1,
            AttemptOutcome::Floor if attempt + 1 >= 3 => {
                let floor_fill = floor_sell(exchange, request, remaining).await?;
                return Ok(request.shares - remaining + floor_fill);
            }
            AttemptOutcome::Floor => attempt += 1,
        }
    }
}

async fn poll_for_fill(exchange: &dyn ExchangeClient, order_id: &crate::core::domain::ExchangeOrderId, outstanding: u64) -> Result<u64> {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_millis(crate::core::executor::POLL_DEADLINE_MS);
    let mut seen = 0u64;
    while tokio::time::Instant::now() < deadline {
        let details = exchange.order(order_id).await?;
        if details.filled_shares > seen {
            seen = details.filled_shares;
        }
        if seen >= outstanding {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(crate::core::executor::POLL_INTERVAL_MS)).await;
    }
    Ok(seen)
}

async fn floor_sell(exchange: &dyn ExchangeClient, request: &CloseRequest, shares: u64) -> Result<u64> {
    let placement = exchange.place_sell_limit_gtc(&request.held_token_id, shares, dec!(0.01), request.tier_flag).await?;
    let filled = poll_for_fill(exchange, &placement.order_id, shares - placement.filled_shares).await?;
    Ok(placement.filled_shares + filled)
}

/// Flatten a whole batch, returning the total shares actually sold across all
/// requests (a caller that needs per-request results should call
/// [`close_one`] directly instead).
pub async fn close_batch(exchange: &dyn ExchangeClient, orderbook: &dyn OrderbookFeed, requests: &[CloseRequest]) -> Result<u64> {
    let combined = crate::core::executor::batch_close(requests);
    let mut total = 0u64;
    for request in &combined {
        total += close_one(exchange, orderbook, request).await?;
    }
    Ok(total)
}
