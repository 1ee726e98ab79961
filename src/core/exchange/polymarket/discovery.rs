//! Market discovery: caches the set of currently tradable binary markets by
//! polling the Polymarket CLOB's public markets listing over plain REST —
//! the same `reqwest` client style used for orderbook snapshots, no CLOB
//! authentication required for a read-only listing.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::debug;

use crate::core::domain::{ConditionId, LifecycleState, Market, MarketSlug, PriceTierFlag, TokenId};
use crate::core::exchange::MarketDiscoveryClient;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    data: Option<Vec<PolymarketMarket>>,
}

#[derive(Debug, Deserialize)]
struct PolymarketMarket {
    condition_id: String,
    #[serde(default)]
    market_slug: Option<String>,
    tokens: Vec<PolymarketToken>,
    active: bool,
    closed: bool,
    #[serde(default)]
    accepting_orders: bool,
    #[serde(default)]
    neg_risk: bool,
}

#[derive(Debug, Deserialize)]
struct PolymarketToken {
    token_id: String,
    outcome: String,
}

pub struct PolymarketMarketDiscoveryClient {
    http: HttpClient,
    clob_url: String,
}

impl PolymarketMarketDiscoveryClient {
    #[must_use]
    pub fn new(clob_url: String) -> Self {
        Self { http: HttpClient::new(), clob_url }
    }
}

#[async_trait]
impl MarketDiscoveryClient for PolymarketMarketDiscoveryClient {
    async fn markets(&self) -> Result<Vec<Market>> {
        let url = format!("{}/markets?active=true&closed=false", self.clob_url);
        let response: MarketsResponse = self.http.get(&url).send().await.map_err(Error::Http)?.json().await.map_err(Error::Http)?;

        let listed = response.data.unwrap_or_default();
        debug!(count = listed.len(), "fetched polymarket markets");

        Ok(listed
            .into_iter()
            .filter(|m| m.tokens.len() == 2 && m.active)
            .map(|m| {
                let lifecycle_state = if m.closed {
                    LifecycleState::Closed
                } else if m.accepting_orders {
                    LifecycleState::Active
                } else {
                    LifecycleState::Closing
                };
                let slug = m.market_slug.clone().unwrap_or_else(|| m.condition_id.clone());
                Market::new(
                    MarketSlug::from(slug),
                    ConditionId::from(m.condition_id),
                    TokenId::from(m.tokens[0].token_id.clone()),
                    TokenId::from(m.tokens[1].token_id.clone()),
                    m.tokens[0].outcome.clone(),
                    m.tokens[1].outcome.clone(),
                    if m.neg_risk { PriceTierFlag::Alternate } else { PriceTierFlag::Standard },
                    lifecycle_state,
                )
            })
            .collect())
    }
}
