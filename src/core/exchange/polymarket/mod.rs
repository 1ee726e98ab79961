//! Polymarket adapters for [`ExchangeClient`](super::ExchangeClient) and
//! [`OnChainClient`](super::OnChainClient), gated behind the `polymarket`
//! feature so the core and its tests build without the CLOB/alloy stack.

mod book;
mod client;
mod discovery;
mod feed;
mod onchain;
mod orders;
mod user_feed;

pub use book::PolymarketOrderbookFeed;
pub use client::{authenticate, derive_user_channel_creds, AuthenticatedClobClient, UserChannelCreds};
pub use discovery::PolymarketMarketDiscoveryClient;
pub use feed::run_market_data_feed;
pub use onchain::PolymarketOnChainClient;
pub use orders::PolymarketExchangeClient;
pub use user_feed::run_private_fill_feed;
