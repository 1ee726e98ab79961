//! Crate-wide error taxonomy.
//!
//! Transient exchange/on-chain errors are retried at the adapter boundary and
//! never reach here as hard failures; what remains are conditions the cycle
//! engine itself needs to reason about (rejections, halts, bad
//! configuration).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration reload: {0}")]
    InvalidReload(String),

    #[error("supervisor halted: {0}")]
    Halted(String),

    #[error("insufficient inventory for {market_slug} side {token_id}: wanted {wanted}, have {available}")]
    InsufficientInventory {
        market_slug: String,
        token_id: String,
        wanted: u64,
        available: u64,
    },

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("no inventory ledger for market {0}")]
    NoInventory(String),

    #[error("inventory slot cap reached ({0} markets)")]
    InventorySlotCapReached(usize),

    #[error("exchange error: {0}")]
    Exchange(String),

    #[error("on-chain error: {0}")]
    OnChain(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[cfg(feature = "polymarket")]
    #[error("Polymarket SDK error: {0}")]
    Polymarket(#[from] polymarket_client_sdk::error::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
