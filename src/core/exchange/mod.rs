//! Ports the cycle engine trades against: exchange order placement, on-chain
//! split/merge, and the two market-data/event feeds it subscribes to.
//!
//! The core never depends on a concrete venue. Each trait here is the seam a
//! concrete adapter (behind the `polymarket` feature) or a test double (behind
//! `testkit`) plugs into.

#[cfg(feature = "polymarket")]
pub mod polymarket;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core::domain::{ExchangeOrderId, Market, PriceTierFlag, TokenId};
use crate::error::Result;

/// The market-discovery client: a caching source of the set of
/// currently tradable markets. The orchestrator polls it to refresh the
/// [`crate::core::domain::MarketRegistry`] it uses to resolve a tick's token
/// id to a market and a side.
#[async_trait]
pub trait MarketDiscoveryClient: Send + Sync {
    async fn markets(&self) -> Result<Vec<Market>>;
}

/// Result of submitting a sell order: the exchange may accept it resting, or
/// fill it immediately in whole or in part.
#[derive(Debug, Clone)]
pub struct PlacementResult {
    pub order_id: ExchangeOrderId,
    pub filled_shares: u64,
    pub filled_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct OpenOrderSummary {
    pub order_id: ExchangeOrderId,
    pub token_id: TokenId,
    pub price: Decimal,
    pub remaining_shares: u64,
}

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order_id: ExchangeOrderId,
    pub status: String,
    pub filled_shares: u64,
    pub filled_price: Option<Decimal>,
}

/// Order placement, cancellation and balance queries against the exchange.
///
/// Implementations must honor `dry_run`: when set, no placement, cancel or
/// balance mutation is submitted to the venue — the call returns a synthetic
/// success without touching the network.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn place_sell_limit_gtc(
        &self,
        token_id: &TokenId,
        shares: u64,
        price: Decimal,
        tier_flag: PriceTierFlag,
    ) -> Result<PlacementResult>;

    async fn cancel(&self, order_id: &ExchangeOrderId) -> Result<()>;

    async fn open_orders(&self, condition_id: &str) -> Result<Vec<OpenOrderSummary>>;

    async fn order(&self, order_id: &ExchangeOrderId) -> Result<OrderDetails>;

    async fn token_balance(&self, token_id: &TokenId) -> Result<u64>;

    async fn collateral_balance(&self) -> Result<Decimal>;
}

#[derive(Debug, Clone)]
pub struct TxHash(pub String);

/// Collateral split/merge. Neither operation is atomic with order placement;
/// callers must never assume ordering between an on-chain confirmation and an
/// exchange order fill.
#[async_trait]
pub trait OnChainClient: Send + Sync {
    async fn split(&self, condition_id: &str, amount: Decimal, tier_flag: PriceTierFlag) -> Result<TxHash>;

    async fn merge(&self, condition_id: &str, shares: u64, tier_flag: PriceTierFlag) -> Result<TxHash>;
}

/// One orderbook update for a token.
#[derive(Debug, Clone)]
pub struct BookTick {
    pub token_id: TokenId,
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Best-bid snapshot query, used by the exit executor when no fresh tick is
/// cached.
#[async_trait]
pub trait OrderbookFeed: Send + Sync {
    async fn best_bid(&self, token_id: &TokenId) -> Result<Option<Decimal>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillKind {
    Matched,
    Mined,
    Confirmed,
    Cancellation,
    Failed,
}

#[derive(Debug, Clone)]
pub struct FillEvent {
    pub order_id: ExchangeOrderId,
    pub kind: FillKind,
    pub price: Option<Decimal>,
    pub size: Option<u64>,
}

/// Marker trait for the private fill push stream; the orchestrator drains its
/// events and hands them to the reconciler. Kept as a trait (rather than a
/// bare channel type) so `testkit` can substitute a scripted feed.
pub trait PrivateFillFeed: Send + Sync {}

/// Polls a sport-specific scoring-event source for one game.
#[async_trait]
pub trait EventFeedAdapter: Send + Sync {
    async fn poll(&self, game_id: &str) -> Result<Vec<crate::core::classifier::ScoringEvent>>;
}
