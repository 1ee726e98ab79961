//! Append-only record of one closed cycle's economics, used for the session
//! PnL running total and for post-hoc analysis.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{MarketSlug, ShockId, TokenId};

/// Why a cycle stopped trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfitHit,
    EventExit,
    ScoringRunBail,
    GameDecided,
    EmergencyTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub shock_id: ShockId,
    pub market_slug: MarketSlug,
    pub token_id: TokenId,
    pub entry_shares: u64,
    pub blended_entry_price: Decimal,
    pub exit_shares: u64,
    pub exit_price: Decimal,
    pub realized_pnl: Decimal,
    pub exit_reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl TradeRecord {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        shock_id: ShockId,
        market_slug: MarketSlug,
        token_id: TokenId,
        entry_shares: u64,
        blended_entry_price: Decimal,
        exit_shares: u64,
        exit_price: Decimal,
        exit_reason: ExitReason,
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    ) -> Self {
        // Each share pair cost $1 to split. blended_entry_price is the price the
        // spiked side sold for; exit_price is the price the held side sold for
        // (take-profit fill, or an adverse-exit estimate of it). Their sum minus
        // the $1 cost basis is the profit per pair.
        let realized_pnl = (blended_entry_price + exit_price - Decimal::ONE) * Decimal::from(exit_shares);
        Self {
            id,
            shock_id,
            market_slug,
            token_id,
            entry_shares,
            blended_entry_price,
            exit_shares,
            exit_price,
            realized_pnl,
            exit_reason,
            opened_at,
            closed_at,
        }
    }

    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.realized_pnl.is_sign_negative() && !self.realized_pnl.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_record(exit_price: Decimal) -> TradeRecord {
        TradeRecord::new(
            Uuid::nil(),
            ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000),
            MarketSlug::from("m"),
            TokenId::from("token-a"),
            20,
            dec!(0.60),
            20,
            exit_price,
            ExitReason::TakeProfitHit,
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            DateTime::from_timestamp(1_700_000_300, 0).unwrap(),
        )
    }

    #[test]
    fn selling_the_held_side_above_the_complement_is_a_profit() {
        // entry 0.60 + exit 0.45 - 1 = 0.05/share, above the 0.40 breakeven complement
        let record = make_record(dec!(0.45));
        assert_eq!(record.realized_pnl, dec!(1.00));
        assert!(!record.is_loss());
    }

    #[test]
    fn selling_the_held_side_below_the_complement_is_a_loss() {
        // entry 0.60 + exit 0.30 - 1 = -0.10/share, below the 0.40 breakeven complement
        let record = make_record(dec!(0.30));
        assert_eq!(record.realized_pnl, dec!(-2.00));
        assert!(record.is_loss());
    }

    #[test]
    fn breakeven_exit_is_not_a_loss() {
        let record = make_record(dec!(0.40));
        assert!(record.realized_pnl.is_zero());
        assert!(!record.is_loss());
    }
}
