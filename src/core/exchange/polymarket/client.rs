//! Authenticated CLOB client construction: wraps the signer/chain-id
//! handshake the SDK requires into a single entry point the composition root
//! calls once at startup.

use std::str::FromStr;

use alloy_signer_local::PrivateKeySigner;
use polymarket_client_sdk::auth::state::Authenticated;
use polymarket_client_sdk::auth::Normal;
use polymarket_client_sdk::auth::Signer;
use polymarket_client_sdk::clob::{Client, Config as ClobConfig};
use secrecy::ExposeSecret;
use tracing::info;

use crate::error::{Error, Result};

/// The CLOB client once the auth handshake has completed. Every order
/// placement and cancellation call goes through this type.
pub type AuthenticatedClobClient = Client<Authenticated<Normal>>;

/// L2 API credentials for the user websocket channel, derived from the
/// wallet's L1 signature rather than stored anywhere.
pub struct UserChannelCreds {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

/// Authenticate against the CLOB with a raw hex private key and return the
/// client plus the signer it was authenticated with (entry placement needs
/// the signer again to sign each order).
pub async fn authenticate(clob_url: &str, private_key: &str, chain_id: u64) -> Result<(AuthenticatedClobClient, PrivateKeySigner)> {
    let signer = signer_from_private_key(private_key, chain_id)?;

    info!(chain_id, address = %signer.address(), "authenticating polymarket clob client");

    let client = Client::new(clob_url, ClobConfig::default())
        .map_err(|err| Error::Exchange(format!("failed to create clob client: {err}")))?
        .authentication_builder(&signer)
        .authenticate()
        .await
        .map_err(|err| Error::Exchange(format!("clob authentication failed: {err}")))?;

    info!("polymarket clob client authenticated");
    Ok((client, signer))
}

/// Derive L2 API credentials (key/secret/passphrase) for the user websocket
/// channel from the same wallet signature the CLOB client authenticates
/// with, rather than asking the operator to configure them separately.
pub async fn derive_user_channel_creds(clob_url: &str, private_key: &str, chain_id: u64) -> Result<UserChannelCreds> {
    let signer = signer_from_private_key(private_key, chain_id)?;

    let client = Client::new(clob_url, ClobConfig::default()).map_err(|err| Error::Exchange(format!("failed to create clob client: {err}")))?;
    let creds = client
        .derive_api_key(&signer, None)
        .await
        .map_err(|err| Error::Exchange(format!("failed to derive user channel credentials: {err}")))?;

    Ok(UserChannelCreds {
        api_key: creds.key().to_string(),
        secret: creds.secret().expose_secret().to_string(),
        passphrase: creds.passphrase().expose_secret().to_string(),
    })
}

fn signer_from_private_key(private_key: &str, chain_id: u64) -> Result<PrivateKeySigner> {
    Ok(PrivateKeySigner::from_str(private_key)
        .map_err(|err| Error::Config(format!("invalid WALLET_PRIVATE_KEY: {err}")))?
        .with_chain_id(Some(chain_id)))
}
