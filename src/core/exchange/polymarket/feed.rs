//! Wire message types and the market-data WebSocket task.
//!
//! Connects to the Polymarket real-time feed, subscribes to a fixed set of
//! token ids, and turns `book`/`price_change` frames into [`BookTick`]s on an
//! `mpsc` channel the orchestrator drains. Does not reconnect on its own —
//! the caller owns retry/backoff around `run_market_data_feed`.

use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::core::domain::TokenId;
use crate::core::exchange::BookTick;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct SubscribeMessage {
    assets_ids: Vec<String>,
    #[serde(rename = "type")]
    msg_type: String,
}

impl SubscribeMessage {
    fn new(asset_ids: Vec<String>) -> Self {
        Self { assets_ids: asset_ids, msg_type: "market".into() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type")]
enum WsMessage {
    #[serde(rename = "book")]
    Book(BookMessage),
    #[serde(rename = "price_change")]
    PriceChange(serde_json::Value),
    #[serde(rename = "tick_size_change")]
    TickSizeChange(serde_json::Value),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct BookMessage {
    asset_id: String,
    bids: Vec<WsPriceLevel>,
    asks: Vec<WsPriceLevel>,
}

#[derive(Debug, Deserialize)]
struct WsPriceLevel {
    price: String,
    #[allow(dead_code)]
    size: String,
}

impl BookMessage {
    fn best_bid(&self) -> Option<Decimal> {
        self.bids.iter().filter_map(|l| l.price.parse().ok()).max()
    }

    fn best_ask(&self) -> Option<Decimal> {
        self.asks.iter().filter_map(|l| l.price.parse().ok()).min()
    }

    fn to_tick(&self, now: chrono::DateTime<chrono::Utc>) -> Option<BookTick> {
        Some(BookTick {
            token_id: TokenId::from(self.asset_id.clone()),
            bid: self.best_bid()?,
            ask: self.best_ask()?,
            timestamp: now,
        })
    }
}

/// Runs one market-data connection to completion: connects, subscribes to
/// `token_ids`, and forwards every fully-quoted book snapshot as a
/// [`BookTick`] until the server closes the connection or the socket errors.
///
/// Parse failures on individual frames are logged and skipped; only a
/// connection-level error or server close ends the loop.
pub async fn run_market_data_feed(url: &str, token_ids: &[TokenId], sink: mpsc::Sender<BookTick>) -> Result<()> {
    info!(%url, "connecting to market data feed");
    let (mut ws, response) = connect_async(url).await?;
    info!(status = %response.status(), "market data feed connected");

    let asset_ids: Vec<String> = token_ids.iter().map(|t| t.as_str().to_string()).collect();
    let msg = SubscribeMessage::new(asset_ids.clone());
    ws.send(Message::Text(serde_json::to_string(&msg)?)).await?;
    info!(assets = ?asset_ids, "subscribed to market data");

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!(raw = %text, "market data frame");
                match serde_json::from_str::<WsMessage>(&text) {
                    Ok(WsMessage::Book(book)) => {
                        if let Some(tick) = book.to_tick(chrono::Utc::now()) {
                            if sink.send(tick).await.is_err() {
                                info!("tick receiver dropped, ending market data feed");
                                break;
                            }
                        }
                    }
                    Ok(WsMessage::PriceChange(_) | WsMessage::TickSizeChange(_) | WsMessage::Unknown) => {}
                    Err(err) => warn!(error = %err, raw = %text, "failed to parse market data frame"),
                }
            }
            Ok(Message::Ping(data)) => {
                ws.send(Message::Pong(data)).await?;
            }
            Ok(Message::Close(frame)) => {
                info!(frame = ?frame, "market data feed closed by server");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                error!(error = %err, "market data feed error");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_message_picks_best_bid_and_ask() {
        let book = BookMessage {
            asset_id: "t1".into(),
            bids: vec![
                WsPriceLevel { price: "0.40".into(), size: "10".into() },
                WsPriceLevel { price: "0.45".into(), size: "5".into() },
            ],
            asks: vec![
                WsPriceLevel { price: "0.55".into(), size: "10".into() },
                WsPriceLevel { price: "0.50".into(), size: "5".into() },
            ],
        };
        let tick = book.to_tick(chrono::Utc::now()).unwrap();
        assert_eq!(tick.bid, rust_decimal_macros::dec!(0.45));
        assert_eq!(tick.ask, rust_decimal_macros::dec!(0.50));
    }

    #[test]
    fn book_message_with_empty_side_yields_no_tick() {
        let book = BookMessage { asset_id: "t1".into(), bids: vec![], asks: vec![] };
        assert!(book.to_tick(chrono::Utc::now()).is_none());
    }

    #[test]
    fn unknown_frame_tag_parses_without_error() {
        let parsed: WsMessage = serde_json::from_str(r#"{"event_type":"something_else"}"#).unwrap();
        assert!(matches!(parsed, WsMessage::Unknown));
    }
}
