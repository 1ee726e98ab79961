//! Scripted test doubles for the exchange/on-chain/feed ports, used by
//! integration tests to drive the cycle engine end-to-end without a live
//! Polymarket connection.
//!
//! Each mock is scriptable: a test seeds its responses up front (or mutates
//! them mid-run through the returned handle), then hands the `Arc<dyn Trait>`
//! to an `Orchestrator` exactly as the `polymarket` feature's adapters are.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::core::classifier::ScoringEvent;
use crate::core::domain::{ExchangeOrderId, Market, PriceTierFlag, TokenId};
use crate::core::exchange::{
    EventFeedAdapter, ExchangeClient, MarketDiscoveryClient, OnChainClient, OpenOrderSummary, OrderDetails, OrderbookFeed, PlacementResult, TxHash,
};
use crate::error::{Error, Result};

/// Markets a [`MockMarketDiscoveryClient`] returns, set once at construction —
/// discovery in tests is a fixed fixture, not something scripts mutate mid-run.
#[derive(Debug, Default)]
pub struct MockMarketDiscoveryClient {
    markets: Vec<Market>,
}

impl MockMarketDiscoveryClient {
    #[must_use]
    pub fn new(markets: Vec<Market>) -> Self {
        Self { markets }
    }
}

#[async_trait]
impl MarketDiscoveryClient for MockMarketDiscoveryClient {
    async fn markets(&self) -> Result<Vec<Market>> {
        Ok(self.markets.clone())
    }
}

#[derive(Debug, Default)]
struct ExchangeScript {
    next_order_seq: u64,
    placements: Vec<(TokenId, u64, Decimal, PriceTierFlag)>,
    cancellations: Vec<ExchangeOrderId>,
    forced_fill: Option<(u64, Decimal)>,
    token_balances: HashMap<TokenId, u64>,
    collateral_balance: Decimal,
    reject_next_placement: Option<String>,
}

/// A scriptable [`ExchangeClient`]: every call is recorded, and a test can
/// pre-seed balances or force the next placement to partially/fully fill or
/// be rejected outright.
#[derive(Debug, Default)]
pub struct MockExchangeClient {
    script: Mutex<ExchangeScript>,
}

impl MockExchangeClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token_balance(&self, token_id: TokenId, shares: u64) {
        self.script.lock().token_balances.insert(token_id, shares);
    }

    pub fn set_collateral_balance(&self, balance: Decimal) {
        self.script.lock().collateral_balance = balance;
    }

    /// The next `place_sell_limit_gtc` call reports this many shares filled at
    /// this price instead of resting unfilled.
    pub fn force_next_fill(&self, filled_shares: u64, filled_price: Decimal) {
        self.script.lock().forced_fill = Some((filled_shares, filled_price));
    }

    pub fn reject_next_placement(&self, reason: impl Into<String>) {
        self.script.lock().reject_next_placement = Some(reason.into());
    }

    #[must_use]
    pub fn placements(&self) -> Vec<(TokenId, u64, Decimal, PriceTierFlag)> {
        self.script.lock().placements.clone()
    }

    #[must_use]
    pub fn cancellations(&self) -> Vec<ExchangeOrderId> {
        self.script.lock().cancellations.clone()
    }
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    async fn place_sell_limit_gtc(&self, token_id: &TokenId, shares: u64, price: Decimal, tier_flag: PriceTierFlag) -> Result<PlacementResult> {
        let mut script = self.script.lock();
        if let Some(reason) = script.reject_next_placement.take() {
            return Err(Error::Exchange(reason));
        }
        script.next_order_seq += 1;
        let order_id = ExchangeOrderId::new(format!("mock-order-{}", script.next_order_seq));
        script.placements.push((token_id.clone(), shares, price, tier_flag));
        let (filled_shares, filled_price) = match script.forced_fill.take() {
            Some((shares, price)) => (shares, Some(price)),
            None => (0, None),
        };
        Ok(PlacementResult { order_id, filled_shares, filled_price })
    }

    async fn cancel(&self, order_id: &ExchangeOrderId) -> Result<()> {
        self.script.lock().cancellations.push(order_id.clone());
        Ok(())
    }

    async fn open_orders(&self, _condition_id: &str) -> Result<Vec<OpenOrderSummary>> {
        Ok(Vec::new())
    }

    async fn order(&self, order_id: &ExchangeOrderId) -> Result<OrderDetails> {
        Ok(OrderDetails { order_id: order_id.clone(), status: "open".to_string(), filled_shares: 0, filled_price: None })
    }

    async fn token_balance(&self, token_id: &TokenId) -> Result<u64> {
        Ok(self.script.lock().token_balances.get(token_id).copied().unwrap_or(0))
    }

    async fn collateral_balance(&self) -> Result<Decimal> {
        Ok(self.script.lock().collateral_balance)
    }
}

#[derive(Debug, Default)]
struct OnChainScript {
    next_tx_seq: u64,
    splits: Vec<(String, Decimal, PriceTierFlag)>,
    merges: Vec<(String, u64, PriceTierFlag)>,
}

/// A scriptable [`OnChainClient`]: split/merge always "succeed" with a
/// synthetic transaction hash, recorded for assertions.
#[derive(Debug, Default)]
pub struct MockOnChainClient {
    script: Mutex<OnChainScript>,
}

impl MockOnChainClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn splits(&self) -> Vec<(String, Decimal, PriceTierFlag)> {
        self.script.lock().splits.clone()
    }

    #[must_use]
    pub fn merges(&self) -> Vec<(String, u64, PriceTierFlag)> {
        self.script.lock().merges.clone()
    }
}

#[async_trait]
impl OnChainClient for MockOnChainClient {
    async fn split(&self, condition_id: &str, amount: Decimal, tier_flag: PriceTierFlag) -> Result<TxHash> {
        let mut script = self.script.lock();
        script.next_tx_seq += 1;
        script.splits.push((condition_id.to_string(), amount, tier_flag));
        Ok(TxHash(format!("mock-split-{}", script.next_tx_seq)))
    }

    async fn merge(&self, condition_id: &str, shares: u64, tier_flag: PriceTierFlag) -> Result<TxHash> {
        let mut script = self.script.lock();
        script.next_tx_seq += 1;
        script.merges.push((condition_id.to_string(), shares, tier_flag));
        Ok(TxHash(format!("mock-merge-{}", script.next_tx_seq)))
    }
}

/// A scriptable [`OrderbookFeed`]: a test seeds one best-bid per token, and
/// can overwrite it mid-run to simulate price movement.
#[derive(Debug, Default)]
pub struct MockOrderbookFeed {
    bids: Mutex<HashMap<TokenId, Decimal>>,
}

impl MockOrderbookFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_best_bid(&self, token_id: TokenId, bid: Decimal) {
        self.bids.lock().insert(token_id, bid);
    }
}

#[async_trait]
impl OrderbookFeed for MockOrderbookFeed {
    async fn best_bid(&self, token_id: &TokenId) -> Result<Option<Decimal>> {
        Ok(self.bids.lock().get(token_id).copied())
    }
}

/// A scriptable [`EventFeedAdapter`]: a test queues scoring events per game,
/// each `poll` call draining whatever is queued for that game id.
#[derive(Debug, Default)]
pub struct MockEventFeedAdapter {
    queued: Mutex<HashMap<String, Vec<ScoringEvent>>>,
}

impl MockEventFeedAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, game_id: impl Into<String>, events: Vec<ScoringEvent>) {
        self.queued.lock().entry(game_id.into()).or_default().extend(events);
    }
}

#[async_trait]
impl EventFeedAdapter for MockEventFeedAdapter {
    async fn poll(&self, game_id: &str) -> Result<Vec<ScoringEvent>> {
        Ok(self.queued.lock().remove(game_id).unwrap_or_default())
    }
}

/// Convenience bundle so a test can build a full `Ports` set in one call.
#[must_use]
pub fn scripted_ports(markets: Vec<Market>) -> (Arc<MockExchangeClient>, Arc<MockOnChainClient>, Arc<MockOrderbookFeed>, Arc<MockEventFeedAdapter>, Arc<MockMarketDiscoveryClient>) {
    (
        Arc::new(MockExchangeClient::new()),
        Arc::new(MockOnChainClient::new()),
        Arc::new(MockOrderbookFeed::new()),
        Arc::new(MockEventFeedAdapter::new()),
        Arc::new(MockMarketDiscoveryClient::new(markets)),
    )
}
