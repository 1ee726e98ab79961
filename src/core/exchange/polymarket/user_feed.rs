//! Private fill/order-update WebSocket task: the push half of fill
//! reconciliation. Authenticates onto Polymarket's user channel and turns
//! `order`/`trade` frames into [`FillEvent`]s on an `mpsc` channel; the
//! orchestrator's poll-based reconciliation pass covers the gap between
//! connects and after a drop.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::core::domain::ExchangeOrderId;
use crate::core::exchange::{FillEvent, FillKind};
use crate::error::Result;

#[derive(Debug, Serialize)]
struct UserSubscribeMessage {
    #[serde(rename = "type")]
    msg_type: String,
    markets: Vec<String>,
    auth: UserAuth,
}

#[derive(Debug, Serialize)]
struct UserAuth {
    api_key: String,
    secret: String,
    passphrase: String,
}

impl UserSubscribeMessage {
    fn new(condition_ids: Vec<String>, auth: UserAuth) -> Self {
        Self { msg_type: "user".into(), markets: condition_ids, auth }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type")]
enum UserWsMessage {
    #[serde(rename = "order")]
    Order(OrderUpdateMessage),
    #[serde(rename = "trade")]
    Trade(TradeMessage),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct OrderUpdateMessage {
    id: String,
    #[serde(rename = "type")]
    update_type: String,
}

#[derive(Debug, Deserialize)]
struct TradeMessage {
    id: String,
    status: String,
    price: Option<rust_decimal::Decimal>,
    size: Option<u64>,
}

impl OrderUpdateMessage {
    fn to_fill(&self) -> FillEvent {
        let kind = match self.update_type.as_str() {
            "CANCELLATION" => FillKind::Cancellation,
            _ => FillKind::Matched,
        };
        FillEvent { order_id: ExchangeOrderId::new(self.id.clone()), kind, price: None, size: None }
    }
}

impl TradeMessage {
    fn to_fill(&self) -> FillEvent {
        let kind = match self.status.as_str() {
            "MINED" => FillKind::Mined,
            "CONFIRMED" => FillKind::Confirmed,
            "FAILED" => FillKind::Failed,
            _ => FillKind::Matched,
        };
        FillEvent { order_id: ExchangeOrderId::new(self.id.clone()), kind, price: self.price, size: self.size }
    }
}

/// Connects to the user channel, authenticates with the given API
/// credentials, and forwards every order/trade update as a [`FillEvent`]
/// until the connection closes or errors. Does not reconnect.
pub async fn run_private_fill_feed(
    url: &str,
    condition_ids: &[String],
    api_key: String,
    secret: String,
    passphrase: String,
    sink: mpsc::Sender<FillEvent>,
) -> Result<()> {
    info!(%url, "connecting to private fill feed");
    let (mut ws, response) = connect_async(url).await?;
    info!(status = %response.status(), "private fill feed connected");

    let auth = UserAuth { api_key, secret, passphrase };
    let msg = UserSubscribeMessage::new(condition_ids.to_vec(), auth);
    ws.send(Message::Text(serde_json::to_string(&msg)?)).await?;
    info!("subscribed to private fill feed");

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!(raw = %text, "private fill frame");
                match serde_json::from_str::<UserWsMessage>(&text) {
                    Ok(UserWsMessage::Order(order)) => {
                        if sink.send(order.to_fill()).await.is_err() {
                            info!("fill receiver dropped, ending private fill feed");
                            break;
                        }
                    }
                    Ok(UserWsMessage::Trade(trade)) => {
                        if sink.send(trade.to_fill()).await.is_err() {
                            info!("fill receiver dropped, ending private fill feed");
                            break;
                        }
                    }
                    Ok(UserWsMessage::Unknown) => {}
                    Err(err) => warn!(error = %err, raw = %text, "failed to parse private fill frame"),
                }
            }
            Ok(Message::Ping(data)) => {
                ws.send(Message::Pong(data)).await?;
            }
            Ok(Message::Close(frame)) => {
                info!(frame = ?frame, "private fill feed closed by server");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                error!(error = %err, "private fill feed error");
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
    fn order_cancellation_maps_to_cancellation_kind() {
        let msg = OrderUpdateMessage { id: "o1".into(), update_type: "CANCELLATION".into() };
        let fill = msg.to_fill();
        assert!(matches!(fill.kind, FillKind::Cancellation));
    }

    #[test]
    fn order_placement_maps_to_matched_kind() {
        let msg = OrderUpdateMessage { id: "o1".into(), update_type: "PLACEMENT".into() };
        let fill = msg.to_fill();
        assert!(matches!(fill.kind, FillKind::Matched));
    }

    #[test]
    fn trade_status_maps_to_fill_kind() {
        let mined = TradeMessage { id: "o1".into(), status: "MINED".into(), price: None, size: None };
        assert!(matches!(mined.to_fill().kind, FillKind::Mined));
        let failed = TradeMessage { id: "o1".into(), status: "FAILED".into(), price: None, size: None };
        assert!(matches!(failed.to_fill().kind, FillKind::Failed));
    }
}
