//! Market-related domain types.
//!
//! The market itself is external, read-only state to the core — discovered by
//! the market-discovery client — but the cycle engine needs a typed view of
//! it to reason about complementary tokens and contract variants.

use serde::{Deserialize, Serialize};

use super::id::{ConditionId, MarketSlug, TokenId};

/// Selects which on-chain contract variant split/merge/sell must use for a
/// market. Named a flag rather than a richer enum because the upstream
/// market-discovery client surfaces it as a single boolean per market.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceTierFlag {
    #[default]
    Standard,
    Alternate,
}

/// Lifecycle state of a market as reported by market discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Active,
    Closing,
    Closed,
}

/// A binary prediction market: two complementary tokens that redeem for exactly
/// one unit of collateral together.
///
/// One share of `token_a` and one share of `token_b` redeem for exactly one
/// unit of collateral. Three-outcome markets are not represented by this type —
/// callers that encounter a non-binary contract must reject the market before
/// constructing one of these.
#[derive(Debug, Clone)]
pub struct Market {
    market_slug: MarketSlug,
    condition_id: ConditionId,
    token_a: TokenId,
    token_b: TokenId,
    outcome_name_a: String,
    outcome_name_b: String,
    tier_flag: PriceTierFlag,
    lifecycle_state: LifecycleState,
}

impl Market {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market_slug: MarketSlug,
        condition_id: ConditionId,
        token_a: TokenId,
        token_b: TokenId,
        outcome_name_a: impl Into<String>,
        outcome_name_b: impl Into<String>,
        tier_flag: PriceTierFlag,
        lifecycle_state: LifecycleState,
    ) -> Self {
        Self {
            market_slug,
            condition_id,
            token_a,
            token_b,
            outcome_name_a: outcome_name_a.into(),
            outcome_name_b: outcome_name_b.into(),
            tier_flag,
            lifecycle_state,
        }
    }

    #[must_use]
    pub const fn market_slug(&self) -> &MarketSlug {
        &self.market_slug
    }

    #[must_use]
    pub const fn condition_id(&self) -> &ConditionId {
        &self.condition_id
    }

    #[must_use]
    pub const fn token_a(&self) -> &TokenId {
        &self.token_a
    }

    #[must_use]
    pub const fn token_b(&self) -> &TokenId {
        &self.token_b
    }

    /// The complementary token of `token`, if `token` belongs to this market.
    #[must_use]
    pub fn complement_of(&self, token: &TokenId) -> Option<&TokenId> {
        if token == &self.token_a {
            Some(&self.token_b)
        } else if token == &self.token_b {
            Some(&self.token_a)
        } else {
            None
        }
    }

    #[must_use]
    pub fn outcome_name(&self, token: &TokenId) -> Option<&str> {
        if token == &self.token_a {
            Some(&self.outcome_name_a)
        } else if token == &self.token_b {
            Some(&self.outcome_name_b)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn tier_flag(&self) -> PriceTierFlag {
        self.tier_flag
    }

    #[must_use]
    pub const fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }

    #[must_use]
    pub fn contains_token(&self, token: &TokenId) -> bool {
        token == &self.token_a || token == &self.token_b
    }
}

/// Caches the markets the market-discovery client has returned, indexed for
/// the lookups the tick and reconciliation paths need:
/// which market a token belongs to, and which side of that market a token
/// is.
///
/// The registry is refreshed wholesale by the orchestrator's discovery poll;
/// it never mutates a `Market` in place, only replaces the map.
#[derive(Debug, Default, Clone)]
pub struct MarketRegistry {
    by_token: std::collections::HashMap<TokenId, Market>,
}

impl MarketRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry's contents with a fresh discovery snapshot.
    pub fn replace(&mut self, markets: Vec<Market>) {
        self.by_token.clear();
        for market in markets {
            self.by_token.insert(market.token_a.clone(), market.clone());
            self.by_token.insert(market.token_b.clone(), market);
        }
    }

    #[must_use]
    pub fn market_for_token(&self, token_id: &TokenId) -> Option<&Market> {
        self.by_token.get(token_id)
    }

    #[must_use]
    pub fn is_token_a(&self, market: &Market, token_id: &TokenId) -> bool {
        market.token_a() == token_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_token.len() / 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// Every distinct market currently registered, deduplicated (each market
    /// is stored twice internally, once per token id).
    pub fn all(&self) -> impl Iterator<Item = &Market> {
        let mut seen = std::collections::HashSet::new();
        self.by_token.values().filter(move |m| seen.insert(m.market_slug().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_market() -> Market {
        Market::new(
            MarketSlug::from("nba-lal-gsw"),
            ConditionId::from("cond-1"),
            TokenId::from("lal-token"),
            TokenId::from("gsw-token"),
            "Lakers",
            "Warriors",
            PriceTierFlag::Standard,
            LifecycleState::Active,
        )
    }

    #[test]
    fn complement_of_returns_the_other_token() {
        let market = make_market();
        assert_eq!(
            market.complement_of(&TokenId::from("lal-token")),
            Some(&TokenId::from("gsw-token"))
        );
        assert_eq!(
            market.complement_of(&TokenId::from("gsw-token")),
            Some(&TokenId::from("lal-token"))
        );
    }

    #[test]
    fn complement_of_unknown_token_is_none() {
        let market = make_market();
        assert_eq!(market.complement_of(&TokenId::from("other")), None);
    }

    #[test]
    fn outcome_name_maps_token_to_team_name() {
        let market = make_market();
        assert_eq!(market.outcome_name(&TokenId::from("lal-token")), Some("Lakers"));
    }

    #[test]
    fn contains_token_is_true_for_either_side() {
        let market = make_market();
        assert!(market.contains_token(&TokenId::from("lal-token")));
        assert!(!market.contains_token(&TokenId::from("nyk-token")));
    }

    #[test]
    fn registry_resolves_either_token_to_the_same_market() {
        let mut registry = MarketRegistry::new();
        registry.replace(vec![make_market()]);
        assert_eq!(registry.len(), 1);
        let via_a = registry.market_for_token(&TokenId::from("lal-token")).unwrap();
        let via_b = registry.market_for_token(&TokenId::from("gsw-token")).unwrap();
        assert_eq!(via_a.market_slug(), via_b.market_slug());
        assert!(registry.is_token_a(via_a, &TokenId::from("lal-token")));
        assert!(!registry.is_token_a(via_b, &TokenId::from("gsw-token")));
    }

    #[test]
    fn replace_drops_markets_not_in_the_new_snapshot() {
        let mut registry = MarketRegistry::new();
        registry.replace(vec![make_market()]);
        registry.replace(vec![]);
        assert!(registry.is_empty());
        assert!(registry.market_for_token(&TokenId::from("lal-token")).is_none());
    }
}
