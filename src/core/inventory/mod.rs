//! Inventory ledger: per-market share counts under the split/consume/return/
//! merge conservation invariant.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::core::domain::{ConditionId, Inventory, MarketSlug, PriceTierFlag, TokenId};
use crate::error::{Error, Result};

/// Ladder sizing parameters, used to derive the pre-split and refill amounts.
#[derive(Debug, Clone)]
pub struct SizingConfig {
    pub ladder_sizes: Vec<u64>,
    pub max_cycles_per_game: u32,
    pub max_concurrent_games: usize,
}

impl SizingConfig {
    #[must_use]
    pub fn cycle_size(&self) -> u64 {
        self.ladder_sizes.iter().sum()
    }

    /// `maxCyclesPerGame × cycleSize + ladderSizes[0] + ladderSizes[1]`: room
    /// for a second cycle's two smallest ladders while a first cycle's larger
    /// ladders are still committed.
    #[must_use]
    pub fn pre_split_size(&self) -> u64 {
        let cushion = self.ladder_sizes.first().copied().unwrap_or(0) + self.ladder_sizes.get(1).copied().unwrap_or(0);
        u64::from(self.max_cycles_per_game) * self.cycle_size() + cushion
    }

    #[must_use]
    pub fn refill_threshold(&self) -> u64 {
        self.cycle_size()
    }

    #[must_use]
    pub fn refill_amount(&self) -> u64 {
        self.cycle_size()
    }
}

/// Owns every market's [`Inventory`] and enforces the conservation invariant.
///
/// Split and merge are external side effects (on-chain transactions); this
/// ledger only records their accounting consequences and never submits them
/// itself — callers pass in the amount to credit/debit after the transaction
/// is confirmed, or roll back by simply not calling these methods on failure.
#[derive(Default)]
pub struct InventoryLedger {
    inventories: HashMap<MarketSlug, Inventory>,
    refill_in_flight: HashSet<MarketSlug>,
}

impl InventoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, market_slug: &MarketSlug) -> Option<&Inventory> {
        self.inventories.get(market_slug)
    }

    #[must_use]
    pub fn market_count(&self) -> usize {
        self.inventories.len()
    }

    /// Every market's inventory, for checkpoint export.
    pub fn all(&self) -> impl Iterator<Item = &Inventory> {
        self.inventories.values()
    }

    /// Create a fresh ledger entry for `market_slug`, or top up an existing
    /// one, crediting `amount` to both sides after a successful split.
    pub fn create_or_top_up(
        &mut self,
        market_slug: MarketSlug,
        condition_id: ConditionId,
        tier_flag: PriceTierFlag,
        amount: u64,
        cost: Decimal,
        sizing: &SizingConfig,
    ) -> Result<()> {
        if !self.inventories.contains_key(&market_slug) && self.inventories.len() >= sizing.max_concurrent_games {
            return Err(Error::InventorySlotCapReached(sizing.max_concurrent_games));
        }
        let inventory = self
            .inventories
            .entry(market_slug.clone())
            .or_insert_with(|| Inventory::new(market_slug, condition_id, tier_flag));
        inventory.shares_a += amount;
        inventory.shares_b += amount;
        inventory.total_split_cost += cost;
        Ok(())
    }

    /// Deduct `shares` from the sell side named by `token_id`. The paired
    /// complement side is untouched — it is committed later, by the position
    /// record created on fill.
    pub fn consume_sell_side(&mut self, market_slug: &MarketSlug, token_id: &TokenId, is_token_a: bool, shares: u64) -> Result<()> {
        let inventory = self
            .inventories
            .get_mut(market_slug)
            .ok_or_else(|| Error::NoInventory(market_slug.to_string()))?;
        let side = if is_token_a { &mut inventory.shares_a } else { &mut inventory.shares_b };
        if *side < shares {
            return Err(Error::InsufficientInventory {
                market_slug: market_slug.to_string(),
                token_id: token_id.to_string(),
                wanted: shares,
                available: *side,
            });
        }
        *side -= shares;
        Ok(())
    }

    /// Return previously-consumed shares to the sell side, on order
    /// cancellation or placement failure. Idempotency with respect to a given
    /// local order id is the caller's (reconciliation layer's) responsibility.
    pub fn return_sell_side(&mut self, market_slug: &MarketSlug, is_token_a: bool, shares: u64) -> Result<()> {
        let inventory = self
            .inventories
            .get_mut(market_slug)
            .ok_or_else(|| Error::NoInventory(market_slug.to_string()))?;
        if is_token_a {
            inventory.shares_a += shares;
        } else {
            inventory.shares_b += shares;
        }
        Ok(())
    }

    /// Merge the balanced portion of a market's inventory back to collateral.
    /// Returns the number of shares merged, or `0` if nothing was balanced.
    /// The caller submits the on-chain merge transaction for the returned
    /// amount and only calls this once it has confirmed.
    pub fn mergeable(&self, market_slug: &MarketSlug) -> u64 {
        self.inventories.get(market_slug).map(Inventory::mergeable).unwrap_or(0)
    }

    pub fn apply_merge(&mut self, market_slug: &MarketSlug, amount: u64) -> Result<()> {
        let inventory = self
            .inventories
            .get_mut(market_slug)
            .ok_or_else(|| Error::NoInventory(market_slug.to_string()))?;
        inventory.shares_a -= amount;
        inventory.shares_b -= amount;
        Ok(())
    }

    /// Whether `market_slug`'s balanced side has fallen to or below the
    /// refill threshold and no refill is already in flight for it.
    #[must_use]
    pub fn needs_refill(&self, market_slug: &MarketSlug, sizing: &SizingConfig) -> bool {
        if self.refill_in_flight.contains(market_slug) {
            return false;
        }
        self.inventories
            .get(market_slug)
            .is_some_and(|inv| inv.shares_a.min(inv.shares_b) <= sizing.refill_threshold())
    }

    /// Mark a refill as in-flight; a per-market guard collapses concurrent
    /// refill requests into one.
    pub fn begin_refill(&mut self, market_slug: MarketSlug) -> bool {
        self.refill_in_flight.insert(market_slug)
    }

    pub fn finish_refill(&mut self, market_slug: &MarketSlug) {
        self.refill_in_flight.remove(market_slug);
    }

    /// Drop a market's ledger entry entirely, freeing its concurrent-game
    /// slot. Called after game-decided termination.
    pub fn remove(&mut self, market_slug: &MarketSlug) {
        self.inventories.remove(market_slug);
        self.refill_in_flight.remove(market_slug);
    }
}
