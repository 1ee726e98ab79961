//! Exchange/on-chain connection configuration. The wallet private key is read
//! from the environment, never from the config file.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Testnet,
    Mainnet,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Testnet => write!(f, "testnet"),
            Self::Mainnet => write!(f, "mainnet"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_clob_url")]
    pub clob_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_standard_contract")]
    pub standard_contract: String,
    #[serde(default = "default_alternate_contract")]
    pub alternate_contract: String,
    /// Private key is never read from this struct's `Deserialize` impl
    /// directly; `Config::load` overwrites it from `WALLET_PRIVATE_KEY` after
    /// parsing the rest of the file.
    #[serde(skip)]
    pub private_key: Option<String>,
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".into()
}

const fn default_chain_id() -> u64 {
    80002
}

fn default_standard_contract() -> String {
    "0x0000000000000000000000000000000000000000".into()
}

fn default_alternate_contract() -> String {
    "0x0000000000000000000000000000000000000000".into()
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            clob_url: default_clob_url(),
            chain_id: default_chain_id(),
            standard_contract: default_standard_contract(),
            alternate_contract: default_alternate_contract(),
            private_key: None,
        }
    }
}
