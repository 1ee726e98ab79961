//! Ladder entry orders: the individual resting sell orders that make up a
//! shock's entry ladder.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ExchangeOrderId, LocalOrderId, MarketSlug, ShockId, TokenId};

/// Lifecycle of a single ladder order. `Resting` is the only non-terminal state;
/// `Filled`/`Cancelled`/`Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingPlace,
    Resting,
    Filled,
    Cancelled,
    Failed,
}

impl OrderStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Failed)
    }
}

/// A single ladder level's sell order.
///
/// While `Resting`, `shares` is committed against the inventory side it was
/// drawn from: placing the order only ever moves shares from "free inventory"
/// to "committed to this order", it never creates or destroys shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderOrder {
    pub local_id: LocalOrderId,
    pub exchange_order_id: Option<ExchangeOrderId>,
    pub token_id: TokenId,
    pub market_slug: MarketSlug,
    pub price: Decimal,
    pub shares: u64,
    pub level: u8,
    pub shock_id: ShockId,
    /// The team the detector attributed this shock to, carried alongside the
    /// order so a later out-of-line fill can open this shock's first
    /// `CumulativeTp` without re-deriving it from the classifier.
    pub shock_team: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub fill_price: Option<Decimal>,
}

impl LadderOrder {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local_id: LocalOrderId,
        token_id: TokenId,
        market_slug: MarketSlug,
        price: Decimal,
        shares: u64,
        level: u8,
        shock_id: ShockId,
        shock_team: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            local_id,
            exchange_order_id: None,
            token_id,
            market_slug,
            price,
            shares,
            level,
            shock_id,
            shock_team,
            status: OrderStatus::PendingPlace,
            created_at,
            filled_at: None,
            fill_price: None,
        }
    }

    #[must_use]
    pub fn is_resting(&self) -> bool {
        self.status == OrderStatus::Resting
    }

    /// Age of a resting order relative to `now`, used by the stale-order reaper.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_order(status: OrderStatus) -> LadderOrder {
        let mut order = LadderOrder::new(
            LocalOrderId(1),
            TokenId::from("token-a"),
            MarketSlug::from("market-1"),
            dec!(0.61),
            5,
            1,
            ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000),
            Some("GSW".to_string()),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        );
        order.status = status;
        order
    }

    #[test]
    fn terminal_statuses_are_identified() {
        assert!(!OrderStatus::PendingPlace.is_terminal());
        assert!(!OrderStatus::Resting.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }

    #[test]
    fn is_resting_matches_status() {
        assert!(make_order(OrderStatus::Resting).is_resting());
        assert!(!make_order(OrderStatus::Filled).is_resting());
    }

    #[test]
    fn age_is_relative_to_created_at() {
        let order = make_order(OrderStatus::Resting);
        let later = DateTime::from_timestamp(1_700_000_070, 0).unwrap();
        assert_eq!(order.age(later).num_seconds(), 70);
    }
}
