//! Handler for the `run` command: build every adapter the config calls for,
//! wire them into an `Orchestrator`, and drive it until a shutdown signal.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::config::Config;
use crate::app::orchestrator::{Orchestrator, Ports};
use crate::error::{Error, Result};

pub async fn run(config_path: &Path, force_dry_run: bool) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if force_dry_run {
        config.dry_run = true;
    }
    config.init_logging();

    info!(dry_run = config.dry_run, "starting shockfade");

    let ports = build_ports(&config).await?;

    let markets = ports.market_discovery.markets().await?;
    let token_ids: Vec<crate::core::domain::TokenId> = markets.iter().flat_map(|m| [m.token_a().clone(), m.token_b().clone()]).collect();
    let condition_ids: Vec<String> = markets.iter().map(|m| m.condition_id().as_str().to_string()).collect();
    info!(markets = markets.len(), "discovered tradable markets");

    let mut orchestrator = Orchestrator::new(config.clone(), ports);
    orchestrator.state().markets_mut().replace(markets);

    let (tick_tx, tick_rx) = mpsc::channel(1024);
    let (fill_tx, fill_rx) = mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    let market_data_url = market_data_ws_url(&config.polymarket.clob_url);
    tokio::spawn(async move {
        if let Err(err) = crate::core::exchange::polymarket::run_market_data_feed(&market_data_url, &token_ids, tick_tx).await {
            warn!(error = %err, "market data feed ended");
        }
    });

    if let Some(private_key) = config.polymarket.private_key.clone() {
        let creds = crate::core::exchange::polymarket::derive_user_channel_creds(&config.polymarket.clob_url, &private_key, config.polymarket.chain_id).await?;
        let user_ws_url = market_data_ws_url(&config.polymarket.clob_url);
        tokio::spawn(async move {
            if let Err(err) =
                crate::core::exchange::polymarket::run_private_fill_feed(&user_ws_url, &condition_ids, creds.api_key, creds.secret, creds.passphrase, fill_tx).await
            {
                warn!(error = %err, "private fill feed ended");
            }
        });
    }

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received, shutting down");
        let _ = shutdown_tx.send(()).await;
    });

    orchestrator.run(tick_rx, fill_rx, shutdown_rx).await
}

/// The CLOB's REST base URL and its websocket base differ only in scheme;
/// both the market-data and user feeds live under `/ws`.
fn market_data_ws_url(clob_url: &str) -> String {
    let ws_base = clob_url.replacen("https://", "wss://", 1).replacen("http://", "ws://", 1);
    format!("{ws_base}/ws/market")
}

#[cfg(feature = "polymarket")]
async fn build_ports(config: &Config) -> Result<Ports> {
    use crate::core::exchange::polymarket::{self, PolymarketExchangeClient, PolymarketMarketDiscoveryClient, PolymarketOnChainClient, PolymarketOrderbookFeed};

    let market_discovery = Arc::new(PolymarketMarketDiscoveryClient::new(config.polymarket.clob_url.clone()));
    let orderbook = Arc::new(PolymarketOrderbookFeed::new(config.polymarket.clob_url.clone()));

    let Some(private_key) = config.polymarket.private_key.clone() else {
        return Err(Error::Config("no wallet configured: set WALLET_PRIVATE_KEY".to_string()));
    };

    let (client, signer) = polymarket::authenticate(&config.polymarket.clob_url, &private_key, config.polymarket.chain_id).await?;
    let exchange_adapter = PolymarketExchangeClient::new(client, signer, config.dry_run);
    exchange_adapter.log_dry_run_posture();
    let exchange: Arc<dyn crate::core::exchange::ExchangeClient> = Arc::new(exchange_adapter);

    let rpc_url: url::Url = rpc_url_for(config.polymarket.environment).parse().map_err(|err: url::ParseError| Error::Config(err.to_string()))?;
    let provider = alloy_provider::ProviderBuilder::new().connect_http(rpc_url);
    let onchain_signer = alloy_signer_local::PrivateKeySigner::from_str(&private_key).map_err(|err| Error::Config(format!("invalid WALLET_PRIVATE_KEY: {err}")))?;
    let standard_contract: alloy_primitives::Address =
        config.polymarket.standard_contract.parse().map_err(|err: alloy_primitives::hex::FromHexError| Error::Config(err.to_string()))?;
    let alternate_contract: alloy_primitives::Address =
        config.polymarket.alternate_contract.parse().map_err(|err: alloy_primitives::hex::FromHexError| Error::Config(err.to_string()))?;
    let onchain = Arc::new(PolymarketOnChainClient::new(provider, onchain_signer, standard_contract, alternate_contract, config.dry_run));

    Ok(Ports { exchange, onchain, orderbook, event_feed: Arc::new(NullEventFeed), market_discovery })
}

#[cfg(not(feature = "polymarket"))]
async fn build_ports(_config: &Config) -> Result<Ports> {
    Err(Error::Config("the polymarket feature is disabled; no exchange adapter is available".to_string()))
}

#[cfg(feature = "polymarket")]
fn rpc_url_for(environment: crate::app::config::Environment) -> &'static str {
    match environment {
        crate::app::config::Environment::Mainnet => "https://polygon-rpc.com",
        crate::app::config::Environment::Testnet => "https://rpc-amoy.polygon.technology",
    }
}

/// No real sports-data feed is wired into the default `run` command. A
/// deployment with a live scoring-event source builds `Ports` directly
/// instead of going through this wiring.
#[cfg(feature = "polymarket")]
struct NullEventFeed;

#[cfg(feature = "polymarket")]
#[async_trait::async_trait]
impl crate::core::exchange::EventFeedAdapter for NullEventFeed {
    async fn poll(&self, _game_id: &str) -> Result<Vec<crate::core::classifier::ScoringEvent>> {
        Ok(Vec::new())
    }
}
