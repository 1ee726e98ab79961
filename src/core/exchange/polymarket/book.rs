//! Best-bid snapshot queries against the Polymarket CLOB's public REST
//! orderbook endpoint, used by the exit executor when no fresher tick is
//! cached for a token. Plain `reqwest`, same as market discovery — no
//! authenticated client needed for a public read.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::TokenId;
use crate::core::exchange::OrderbookFeed;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct OrderBookLevel {
    price: Decimal,
    #[allow(dead_code)]
    size: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderBookResponse {
    bids: Vec<OrderBookLevel>,
}

pub struct PolymarketOrderbookFeed {
    http: HttpClient,
    clob_url: String,
}

impl PolymarketOrderbookFeed {
    #[must_use]
    pub fn new(clob_url: String) -> Self {
        Self { http: HttpClient::new(), clob_url }
    }
}

#[async_trait]
impl OrderbookFeed for PolymarketOrderbookFeed {
    async fn best_bid(&self, token_id: &TokenId) -> Result<Option<Decimal>> {
        let url = format!("{}/book?token_id={}", self.clob_url, token_id.as_str());
        let book: OrderBookResponse = self.http.get(&url).send().await.map_err(Error::Http)?.json().await.map_err(Error::Http)?;

        // The CLOB returns bids sorted ascending by price; the best bid is
        // the highest, i.e. the last entry.
        Ok(book.bids.last().map(|level| level.price))
    }
}
