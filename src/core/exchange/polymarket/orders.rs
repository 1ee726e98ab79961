//! Order placement and cancellation against the Polymarket CLOB: build, sign
//! and post through the authenticated client, mirroring the handshake
//! [`super::client::authenticate`] already completed at startup.

use std::str::FromStr;
use std::sync::Arc;

use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use polymarket_client_sdk::clob::types::request::BalanceAllowanceRequest;
use polymarket_client_sdk::clob::types::{AssetType, Side};
use polymarket_client_sdk::types::U256;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::client::AuthenticatedClobClient;
use crate::core::domain::{ExchangeOrderId, PriceTierFlag, TokenId};
use crate::core::exchange::{ExchangeClient, OpenOrderSummary, OrderDetails, PlacementResult};
use crate::error::{Error, Result};

/// Wraps the authenticated CLOB client with the engine's `dryRun` boundary:
/// when `dry_run` is set, every mutating call short-circuits before reaching
/// the network.
pub struct PolymarketExchangeClient {
    client: Arc<AuthenticatedClobClient>,
    signer: Arc<PrivateKeySigner>,
    dry_run: bool,
}

impl PolymarketExchangeClient {
    #[must_use]
    pub fn new(client: AuthenticatedClobClient, signer: PrivateKeySigner, dry_run: bool) -> Self {
        Self { client: Arc::new(client), signer: Arc::new(signer), dry_run }
    }

    /// Warn-log a dry-run override at startup, mirroring the supervisor's
    /// mandatory-unless-overridden posture on `dryRun`.
    pub fn log_dry_run_posture(&self) {
        if !self.dry_run {
            warn!("dry_run disabled: live orders will be submitted to Polymarket");
        }
    }
}

#[async_trait]
impl ExchangeClient for PolymarketExchangeClient {
    async fn place_sell_limit_gtc(&self, token_id: &TokenId, shares: u64, price: Decimal, _tier_flag: PriceTierFlag) -> Result<PlacementResult> {
        if self.dry_run {
            info!(%token_id, shares, %price, "dry run: skipping live order placement");
            return Ok(PlacementResult { order_id: ExchangeOrderId::new(format!("dryrun-{token_id}-{price}")), filled_shares: 0, filled_price: None });
        }

        let token_id_u256 = U256::from_str(token_id.as_str()).map_err(|err| Error::Exchange(format!("invalid token id {token_id}: {err}")))?;

        let order = self
            .client
            .limit_order()
            .token_id(token_id_u256)
            .side(Side::Sell)
            .price(price)
            .size(Decimal::from(shares))
            .build()
            .await
            .map_err(|err| Error::Exchange(format!("order build failed: {err}")))?;

        let signed_order = self.client.sign(self.signer.as_ref(), order).await.map_err(|err| Error::Exchange(format!("order signing failed: {err}")))?;

        let response = self.client.post_order(signed_order).await.map_err(|err| Error::Exchange(format!("order submission failed: {err}")))?;

        info!(order_id = %response.order_id, %token_id, shares, %price, "sell order submitted");

        Ok(PlacementResult { order_id: ExchangeOrderId::new(response.order_id), filled_shares: 0, filled_price: None })
    }

    async fn cancel(&self, order_id: &ExchangeOrderId) -> Result<()> {
        if self.dry_run {
            info!(%order_id, "dry run: skipping live cancel");
            return Ok(());
        }
        let response = self.client.cancel_order(order_id.as_str()).await.map_err(|err| Error::Exchange(format!("cancel failed: {err}")))?;

        if let Some(reason) = response.not_canceled.get(order_id.as_str()) {
            return Err(Error::Exchange(format!("order {order_id} not cancelled: {reason}")));
        }
        Ok(())
    }

    async fn open_orders(&self, _condition_id: &str) -> Result<Vec<OpenOrderSummary>> {
        // The engine tracks its own resting orders in `CycleBook`; the CLOB
        // client exposes no bulk open-orders listing this adapter needs.
        Ok(Vec::new())
    }

    async fn order(&self, order_id: &ExchangeOrderId) -> Result<OrderDetails> {
        let order = self.client.order(order_id.as_str()).await.map_err(|err| Error::Exchange(format!("order lookup failed: {err}")))?;

        Ok(OrderDetails {
            order_id: order_id.clone(),
            status: order.status.to_string(),
            filled_shares: order.size_matched.to_string().parse().unwrap_or(0),
            filled_price: Decimal::from_str(&order.price.to_string()).ok(),
        })
    }

    async fn token_balance(&self, token_id: &TokenId) -> Result<u64> {
        let token_id_u256 = U256::from_str(token_id.as_str()).map_err(|err| Error::Exchange(format!("invalid token id {token_id}: {err}")))?;
        let request = BalanceAllowanceRequest::builder().asset_type(AssetType::Conditional).token_id(token_id_u256).build();
        let balance = self.client.balance_allowance(request).await.map_err(|err| Error::Exchange(format!("balance lookup failed: {err}")))?;
        Ok(balance.balance.to_string().parse().unwrap_or(0))
    }

    async fn collateral_balance(&self) -> Result<Decimal> {
        let request = BalanceAllowanceRequest::builder().asset_type(AssetType::Collateral).build();
        let balance = self.client.balance_allowance(request).await.map_err(|err| Error::Exchange(format!("collateral balance lookup failed: {err}")))?;
        Decimal::from_str(&balance.balance.to_string()).map_err(|err| Error::Exchange(format!("collateral balance malformed: {err}")))
    }
}
