//! Shock candidates emitted by the detector.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{MarketSlug, ShockId, TokenId};
use super::market::Market;

/// Which way a token's mid moved to trigger a shock.
///
/// `Up` means *this token's* mid rose and the trading side sells this token.
/// `Down` means the complement spiked and the trading side sells the complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A candidate shock emitted by the detector before classification.
#[derive(Debug, Clone)]
pub struct Shock {
    pub token_id: TokenId,
    pub market_slug: MarketSlug,
    pub direction: Direction,
    pub magnitude: Decimal,
    pub z_score: Decimal,
    pub pre_shock_price: Decimal,
    pub current_price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Shock {
    /// The canonical `shockId` for this shock: `tokenId:timestamp`.
    #[must_use]
    pub fn shock_id(&self) -> ShockId {
        ShockId::new(&self.token_id, self.timestamp.timestamp_millis())
    }

    /// The price of the side this shock implies should be sold.
    ///
    /// `direction = Up` sells `token_id` itself at `current_price`; `direction =
    /// Down` sells the complement at `1 - current_price`.
    #[must_use]
    pub fn sell_token_price(&self) -> Decimal {
        match self.direction {
            Direction::Up => self.current_price,
            Direction::Down => super::money::complement(self.current_price),
        }
    }

    /// The token the ladder actually sells: `token_id` itself on an `Up`
    /// shock, or its complement on a `Down` shock (the overshoot is on the
    /// other side). Returns `None` if `market` doesn't contain `token_id`.
    #[must_use]
    pub fn sell_token_id(&self, market: &Market) -> Option<TokenId> {
        match self.direction {
            Direction::Up => market.contains_token(&self.token_id).then(|| self.token_id.clone()),
            Direction::Down => market.complement_of(&self.token_id).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_shock(direction: Direction, current_price: Decimal) -> Shock {
        Shock {
            token_id: TokenId::from("team-a"),
            market_slug: MarketSlug::from("market-1"),
            direction,
            magnitude: dec!(0.05),
            z_score: dec!(3.2),
            pre_shock_price: dec!(0.55),
            current_price,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn sell_token_price_for_up_is_current_price() {
        let shock = make_shock(Direction::Up, dec!(0.61));
        assert_eq!(shock.sell_token_price(), dec!(0.61));
    }

    #[test]
    fn sell_token_price_for_down_is_complement() {
        let shock = make_shock(Direction::Down, dec!(0.61));
        assert_eq!(shock.sell_token_price(), dec!(0.39));
    }

    #[test]
    fn shock_id_embeds_token_and_timestamp_millis() {
        let shock = make_shock(Direction::Up, dec!(0.61));
        assert_eq!(shock.shock_id().as_str(), "team-a:1700000000000");
    }

    fn make_market() -> Market {
        use super::super::id::ConditionId;
        use super::super::market::{LifecycleState, PriceTierFlag};
        Market::new(
            MarketSlug::from("market-1"),
            ConditionId::from("cond-1"),
            TokenId::from("team-a"),
            TokenId::from("team-b"),
            "Team A",
            "Team B",
            PriceTierFlag::Standard,
            LifecycleState::Active,
        )
    }

    #[test]
    fn up_shock_sells_the_spiked_token_itself() {
        let shock = make_shock(Direction::Up, dec!(0.61));
        assert_eq!(shock.sell_token_id(&make_market()), Some(TokenId::from("team-a")));
    }

    #[test]
    fn down_shock_sells_the_complement_token() {
        let shock = make_shock(Direction::Down, dec!(0.61));
        assert_eq!(shock.sell_token_id(&make_market()), Some(TokenId::from("team-b")));
    }
}
