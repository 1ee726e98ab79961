//! Per-market inventory record.
//!
//! This type is pure data. The operations that mutate it under the conservation
//! invariant (`createOrTopUp`, `consumeSellSide`, `returnSellSide`,
//! `mergeBalanced`, `autoRefill`) live in [`crate::core::inventory`], which is the
//! only code path permitted to touch these fields outside of (de)serialization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ConditionId, MarketSlug};
use super::market::PriceTierFlag;

/// Per-market share counts *not currently committed to resting sell orders*.
///
/// Shares committed to resting ladder or take-profit orders are accounted
/// separately on the order records themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub market_slug: MarketSlug,
    pub condition_id: ConditionId,
    pub shares_a: u64,
    pub shares_b: u64,
    pub total_split_cost: Decimal,
    #[serde(with = "tier_flag_serde")]
    pub tier_flag: PriceTierFlag,
}

impl Inventory {
    #[must_use]
    pub fn new(market_slug: MarketSlug, condition_id: ConditionId, tier_flag: PriceTierFlag) -> Self {
        Self {
            market_slug,
            condition_id,
            shares_a: 0,
            shares_b: 0,
            total_split_cost: Decimal::ZERO,
            tier_flag,
        }
    }

    /// The balanced portion mergeable right now: `min(shares_a, shares_b)`.
    #[must_use]
    pub fn mergeable(&self) -> u64 {
        self.shares_a.min(self.shares_b)
    }
}

mod tier_flag_serde {
    use super::PriceTierFlag;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(flag: &PriceTierFlag, s: S) -> Result<S::Ok, S::Error> {
        let is_alternate = matches!(flag, PriceTierFlag::Alternate);
        is_alternate.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PriceTierFlag, D::Error> {
        let is_alternate = bool::deserialize(d)?;
        Ok(if is_alternate {
            PriceTierFlag::Alternate
        } else {
            PriceTierFlag::Standard
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mergeable_is_the_smaller_side() {
        let mut inv = Inventory::new(
            MarketSlug::from("m"),
            ConditionId::from("c"),
            PriceTierFlag::Standard,
        );
        inv.shares_a = 40;
        inv.shares_b = 45;
        assert_eq!(inv.mergeable(), 40);
    }

    #[test]
    fn inventory_round_trips_through_json() {
        let mut inv = Inventory::new(
            MarketSlug::from("m"),
            ConditionId::from("c"),
            PriceTierFlag::Alternate,
        );
        inv.shares_a = 10;
        inv.shares_b = 20;
        let json = serde_json::to_string(&inv).unwrap();
        let back: Inventory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shares_a, 10);
        assert_eq!(back.shares_b, 20);
        assert!(matches!(back.tier_flag, PriceTierFlag::Alternate));
    }
}
