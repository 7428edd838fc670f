use std::time::Duration;

use async_trait::async_trait;
use bitcoin::Network;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Announcement, IssuerWallet, TokenAnnouncement, WalletCredential, WalletError};

/// Issuer wallet reached over the JSON API of a wallet sidecar process that
/// hosts the issuer SDK.
#[derive(Debug)]
pub struct RemoteIssuerWallet {
    base_url: String,
    network: Network,
    client: reqwest::Client,
    funding_address: Option<String>,
}

#[derive(Serialize)]
struct InitRequest<'a> {
    mnemonic: &'a str,
    network: Network,
}

#[derive(Deserialize)]
struct InitResponse {
    funding_address: String,
}

#[derive(Serialize)]
struct MintRequest {
    /// Decimal string; token amounts can exceed what JSON numbers carry safely.
    amount: String,
}

#[derive(Deserialize)]
struct MintResponse {
    tx_id: String,
}

impl RemoteIssuerWallet {
    pub fn new(
        base_url: impl Into<String>,
        network: Network,
        timeout: Duration,
    ) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            network,
            client,
            funding_address: None,
        })
    }

    pub fn funding_address(&self) -> Option<&str> {
        self.funding_address.as_deref()
    }

    fn ensure_initialized(&self) -> Result<(), WalletError> {
        match self.funding_address {
            Some(_) => Ok(()),
            None => Err(WalletError::NotInitialized),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, WalletError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(WalletError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| WalletError::Decode(e.to_string()))
    }
}

#[async_trait]
impl IssuerWallet for RemoteIssuerWallet {
    async fn initialize(&mut self, credential: &WalletCredential) -> Result<String, WalletError> {
        let request = InitRequest {
            mnemonic: credential.expose(),
            network: self.network,
        };
        let response: InitResponse = self.post("/wallet/init", &request).await?;
        self.funding_address = Some(response.funding_address.clone());
        Ok(response.funding_address)
    }

    async fn announce_token(
        &mut self,
        announcement: &TokenAnnouncement,
    ) -> Result<Announcement, WalletError> {
        self.ensure_initialized()?;
        self.post("/tokens/announce", announcement).await
    }

    async fn mint_tokens(&mut self, amount: u128) -> Result<String, WalletError> {
        self.ensure_initialized()?;
        let request = MintRequest {
            amount: amount.to_string(),
        };
        let response: MintResponse = self.post("/tokens/mint", &request).await?;
        Ok(response.tx_id)
    }
}
