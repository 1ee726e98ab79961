//! Exit executor: the GTC-at-bid algorithm used to flatten positions when a
//! cycle terminates by any route other than an ordinary take-profit fill.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::domain::{round_to_tick, tick_size};

/// One attempt's quoted sell price, walking the bid down by 2 cents per
/// retry so a resting order that didn't fill immediately gets more
/// aggressive each time.
#[must_use]
pub fn attempt_price(bid: Decimal, attempt: u8) -> Decimal {
    let tick = tick_size(bid);
    let step = Decimal::from(attempt) * dec!(0.02);
    let raw = bid + tick - step;
    round_to_tick(raw, tick).max(dec!(0.01))
}

/// Outcome of one exit-executor submission cycle for a single held token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// At least 95% of the requested shares filled immediately; done.
    ImmediateFill,
    /// Resting order did not fill within the poll deadline; cancel and
    /// retry at the next attempt's price.
    Retry,
    /// All retries exhausted; floor the price at the minimum tick and accept
    /// whatever liquidity is available.
    Floor,
}

const MAX_ATTEMPTS: u8 = 3;
const IMMEDIATE_FILL_RATIO: Decimal = dec!(0.95);
pub const POLL_INTERVAL_MS: u64 = 500;
pub const POLL_DEADLINE_MS: u64 = 4000;

/// Decide what the executor should do after one submission, given how many
/// shares filled (possibly zero, if the poll deadline expired first) and the
/// requested size.
#[must_use]
pub fn classify_attempt(requested: u64, filled: u64, attempt: u8) -> AttemptOutcome {
    if requested == 0 {
        return AttemptOutcome::ImmediateFill;
    }
    let ratio = Decimal::from(filled) / Decimal::from(requested);
    if ratio >= IMMEDIATE_FILL_RATIO {
        AttemptOutcome::ImmediateFill
    } else if attempt + 1 >= MAX_ATTEMPTS {
        AttemptOutcome::Floor
    } else {
        AttemptOutcome::Retry
    }
}

/// One position-close request fed into the batch-close planner: several
/// positions sharing the same held token are collapsed into a single order.
#[derive(Debug, Clone)]
pub struct CloseRequest {
    pub held_token_id: crate::core::domain::TokenId,
    pub shares: u64,
    pub tier_flag: crate::core::domain::PriceTierFlag,
}

/// Collapse close requests that share a held token into a single combined
/// order per token, preserving first-seen order.
#[must_use]
pub fn batch_close(requests: &[CloseRequest]) -> Vec<CloseRequest> {
    let mut combined: Vec<CloseRequest> = Vec::new();
    for request in requests {
        if let Some(existing) = combined.iter_mut().find(|c| c.held_token_id == request.held_token_id) {
            existing.shares += request.shares;
        } else {
            combined.push(request.clone());
        }
    }
    combined
}
