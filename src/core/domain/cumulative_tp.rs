//! The cumulative, cost-basis-weighted take-profit order tracked per cycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ConditionId, ExchangeOrderId, MarketSlug, ShockId, TokenId};
use super::market::PriceTierFlag;

/// Where a cumulative take-profit stands relative to the cycle it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TpStatus {
    /// No entry fills yet; nothing to take profit on.
    Watching,
    /// At least one entry fill landed and a TP order is resting, partially filled.
    Partial,
    /// The TP order filled in full; the cycle closed in profit.
    Hit,
    /// The cycle was torn down early because its game resolved to the traded
    /// side's event without the TP filling.
    EventExit,
    /// The cycle was torn down because the game entered a scoring run against
    /// the traded side.
    ScoringRunBail,
    /// The cycle hit its emergency timeout before the TP filled.
    Timeout,
    /// Terminal: the cycle's books are closed and reconciled.
    Closed,
}

impl TpStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Hit | Self::EventExit | Self::ScoringRunBail | Self::Timeout | Self::Closed
        )
    }
}

/// Cumulative take-profit state for one cycle, keyed externally by `shock_id`.
///
/// Every entry fill folds into `weighted_entry_sum` and `total_entry_shares`;
/// `blended_entry_price` tracks the average entry price of the shares not yet
/// exited through the TP. The TP price and size are recomputed on every fill
/// and the resting order is cancelled and replaced to match — the engine never
/// amends a resting TP order in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumulativeTp {
    pub shock_id: ShockId,
    pub market_slug: MarketSlug,
    pub condition_id: ConditionId,
    pub tier_flag: PriceTierFlag,
    pub shock_team: Option<String>,

    /// The spiked side being sold into the ladder.
    pub sold_token_id: TokenId,
    /// The complement side the take-profit order sells.
    pub held_token_id: TokenId,

    pub total_entry_shares: u64,
    pub filled_tp_shares: u64,
    pub weighted_entry_sum: Decimal,
    pub blended_entry_price: Decimal,

    pub tp_price: Decimal,
    pub tp_shares: u64,
    pub tp_exchange_order_id: Option<ExchangeOrderId>,

    pub partial_pnl: Decimal,
    pub status: TpStatus,
    pub created_at: DateTime<Utc>,
}

impl CumulativeTp {
    /// Build the TP state from a cycle's first entry fill.
    #[must_use]
    pub fn from_first_fill(
        shock_id: ShockId,
        market_slug: MarketSlug,
        condition_id: ConditionId,
        tier_flag: PriceTierFlag,
        shock_team: Option<String>,
        sold_token_id: TokenId,
        held_token_id: TokenId,
        fill_shares: u64,
        fill_price: Decimal,
        fade_target: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        let blended_entry_price = fill_price;
        let tp_price = super::money::clamp_price(
            Decimal::ONE - blended_entry_price + fade_target,
            rust_decimal_macros::dec!(0.01),
            rust_decimal_macros::dec!(0.99),
        );
        Self {
            shock_id,
            market_slug,
            condition_id,
            tier_flag,
            shock_team,
            sold_token_id,
            held_token_id,
            total_entry_shares: fill_shares,
            filled_tp_shares: 0,
            weighted_entry_sum: Decimal::from(fill_shares) * fill_price,
            blended_entry_price,
            tp_price,
            tp_shares: fill_shares,
            tp_exchange_order_id: None,
            partial_pnl: Decimal::ZERO,
            status: TpStatus::Watching,
            created_at,
        }
    }

    /// Fold a subsequent entry fill into the running cost basis and recompute
    /// the blended price, TP price and TP size.
    ///
    /// The blended price is derived from conservation of TP PnL: it must be the
    /// average entry price of the shares *not yet exited*, so previously-filled
    /// TP shares are excluded from both the numerator and the denominator
    /// (`weighted_entry_sum` carries the full history; `filled_tp_shares *
    /// blended_entry_price` subtracts out the portion already realized at the
    /// prior blended price).
    pub fn apply_entry_fill(&mut self, fill_shares: u64, fill_price: Decimal, fade_target: Decimal) {
        self.total_entry_shares += fill_shares;
        self.weighted_entry_sum += Decimal::from(fill_shares) * fill_price;

        let remaining = self.total_entry_shares - self.filled_tp_shares;
        let realized_weight = Decimal::from(self.filled_tp_shares) * self.blended_entry_price;
        self.blended_entry_price = (self.weighted_entry_sum - realized_weight) / Decimal::from(remaining);
        self.tp_price = super::money::clamp_price(
            Decimal::ONE - self.blended_entry_price + fade_target,
            rust_decimal_macros::dec!(0.01),
            rust_decimal_macros::dec!(0.99),
        );
        self.tp_shares = remaining;
        self.status = if self.filled_tp_shares > 0 {
            TpStatus::Partial
        } else {
            TpStatus::Watching
        };
    }

    /// Fold a TP fill into the running counters. Returns `true` if this fill
    /// fully exhausts `tp_shares` (the cycle should terminate as `Hit`).
    pub fn apply_tp_fill(&mut self, fill_shares: u64, fill_price: Decimal) -> bool {
        let pnl = (fill_price + self.blended_entry_price - Decimal::ONE) * Decimal::from(fill_shares);
        self.partial_pnl += pnl;
        let full = fill_shares >= self.tp_shares;
        if full {
            self.filled_tp_shares += self.tp_shares;
            self.tp_shares = 0;
            self.status = TpStatus::Hit;
        } else {
            self.filled_tp_shares += fill_shares;
            self.tp_shares -= fill_shares;
            self.status = TpStatus::Partial;
        }
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn shock_id() -> ShockId {
        ShockId::new(&TokenId::from("token-a"), 1_700_000_000_000)
    }

    fn make_tp(fill_shares: u64, fill_price: Decimal) -> CumulativeTp {
        CumulativeTp::from_first_fill(
            shock_id(),
            MarketSlug::from("m"),
            ConditionId::from("c"),
            PriceTierFlag::Standard,
            Some("GSW".to_string()),
            TokenId::from("token-a"),
            TokenId::from("token-b"),
            fill_shares,
            fill_price,
            dec!(0.03),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn first_fill_sets_blended_price_and_tp_from_formula() {
        let tp = make_tp(5, dec!(0.61));
        assert_eq!(tp.blended_entry_price, dec!(0.61));
        assert_eq!(tp.tp_price, dec!(0.42));
        assert_eq!(tp.tp_shares, 5);
        assert_eq!(tp.status, TpStatus::Watching);
    }

    #[test]
    fn second_fill_recomputes_blended_price_by_weighted_average() {
        let mut tp = make_tp(5, dec!(0.61));
        tp.apply_entry_fill(10, dec!(0.64), dec!(0.03));
        // weighted sum = 5*0.61 + 10*0.64 = 9.45, remaining = 15
        assert_eq!(tp.blended_entry_price, dec!(0.63));
        assert_eq!(tp.tp_shares, 15);
        assert_eq!(tp.status, TpStatus::Watching);
    }

    #[test]
    fn full_tp_fill_marks_hit_and_zeroes_tp_shares() {
        let mut tp = make_tp(5, dec!(0.61));
        let done = tp.apply_tp_fill(5, dec!(0.42));
        assert!(done);
        assert_eq!(tp.status, TpStatus::Hit);
        assert_eq!(tp.tp_shares, 0);
        assert_eq!(tp.partial_pnl, dec!(0.15));
    }

    #[test]
    fn partial_tp_fill_leaves_remainder_resting() {
        let mut tp = make_tp(10, dec!(0.61));
        let done = tp.apply_tp_fill(4, dec!(0.42));
        assert!(!done);
        assert_eq!(tp.status, TpStatus::Partial);
        assert_eq!(tp.tp_shares, 6);
        assert_eq!(tp.filled_tp_shares, 4);
    }

    #[test]
    fn blended_price_after_partial_tp_then_new_fill_excludes_realized_shares() {
        let mut tp = make_tp(10, dec!(0.61));
        tp.apply_tp_fill(4, dec!(0.42));
        tp.apply_entry_fill(10, dec!(0.70), dec!(0.03));
        // weighted sum = 10*0.61 + 10*0.70 = 13.1; realized = 4*0.61 = 2.44
        // remaining = 16; blended = (13.1 - 2.44) / 16 = 0.66625
        assert_eq!(tp.blended_entry_price, dec!(0.66625));
        assert_eq!(tp.tp_shares, 16);
    }

    #[test]
    fn terminal_statuses_are_identified() {
        assert!(TpStatus::Hit.is_terminal());
        assert!(TpStatus::EventExit.is_terminal());
        assert!(TpStatus::ScoringRunBail.is_terminal());
        assert!(TpStatus::Timeout.is_terminal());
        assert!(TpStatus::Closed.is_terminal());
        assert!(!TpStatus::Watching.is_terminal());
        assert!(!TpStatus::Partial.is_terminal());
    }
}
