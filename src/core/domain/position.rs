//! A position: one entry fill's accounting record, opened when a ladder order
//! fills and closed when its cycle terminates.
//!
//! Positions are accounting records only — they mirror the entry fill and
//! record an exit outcome, but the cumulative take-profit is what actually
//! drives exit decisions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketSlug, ShockId, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// One entry fill's position record. `entry_shares` is fixed at open time;
/// `exited_shares` tracks how much of it has since been taken by FIFO TP
/// allocation, so the original fill size survives into the trade record even
/// after the position closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub shock_id: ShockId,
    pub market_slug: MarketSlug,
    pub sold_token_id: TokenId,
    pub held_token_id: TokenId,
    pub entry_shares: u64,
    pub exited_shares: u64,
    pub entry_price: Decimal,
    pub status: PositionStatus,
    pub exit_price: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        shock_id: ShockId,
        market_slug: MarketSlug,
        sold_token_id: TokenId,
        held_token_id: TokenId,
        entry_shares: u64,
        entry_price: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            shock_id,
            market_slug,
            sold_token_id,
            held_token_id,
            entry_shares,
            exited_shares: 0,
            entry_price,
            status: PositionStatus::Open,
            exit_price: None,
            opened_at,
            closed_at: None,
        }
    }

    #[must_use]
    pub fn remaining_shares(&self) -> u64 {
        self.entry_shares - self.exited_shares
    }

    /// Reduce an open position's remaining shares by a FIFO-allocated TP
    /// fill. Returns the number of shares actually taken, which may be less
    /// than `shares` if the position holds fewer.
    pub fn reduce(&mut self, shares: u64) -> u64 {
        let taken = shares.min(self.remaining_shares());
        self.exited_shares += taken;
        taken
    }

    pub fn close(&mut self, exit_price: Decimal, closed_at: DateTime<Utc>) {
        self.status = PositionStatus::Closed;
        self.exit_price = Some(exit_price);
        self.closed_at = Some(closed_at);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_position() -> Position {
        Position::open(
            ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000),
            MarketSlug::from("m"),
            TokenId::from("token-a"),
            TokenId::from("token-b"),
            10,
            dec!(0.61),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn opens_in_open_status_with_no_exit() {
        let position = make_position();
        assert!(position.is_open());
        assert!(position.exit_price.is_none());
        assert_eq!(position.remaining_shares(), 10);
    }

    #[test]
    fn close_sets_status_exit_price_and_timestamp() {
        let mut position = make_position();
        let closed_at = DateTime::from_timestamp(1_700_000_500, 0).unwrap();
        position.close(dec!(0.42), closed_at);
        assert!(!position.is_open());
        assert_eq!(position.exit_price, Some(dec!(0.42)));
        assert_eq!(position.closed_at, Some(closed_at));
    }

    #[test]
    fn reduce_caps_at_remaining_shares_and_preserves_entry_shares() {
        let mut position = make_position();
        assert_eq!(position.reduce(4), 4);
        assert_eq!(position.remaining_shares(), 6);
        assert_eq!(position.entry_shares, 10);
        assert_eq!(position.reduce(100), 6);
        assert_eq!(position.remaining_shares(), 0);
    }
}
