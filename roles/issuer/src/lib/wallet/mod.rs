//! Seam to the external issuer wallet.
//!
//! The wallet owns custody keys and settlement; this crate only drives it
//! through initialization, token announcement and minting.

pub mod remote;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bip39::Mnemonic;
use serde::{Deserialize, Serialize};
use shared_config::ReserveConfig;
use thiserror::Error;
use zeroize::Zeroizing;

pub use remote::RemoteIssuerWallet;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid wallet credential: {0}")]
    InvalidCredential(String),
    #[error("wallet used before initialization")]
    NotInitialized,
    #[error("wallet rejected request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("wallet transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("undecodable wallet response: {0}")]
    Decode(String),
}

/// The issuer's mnemonic. Zeroed on drop and never printed.
pub struct WalletCredential(Zeroizing<String>);

impl WalletCredential {
    pub fn new(secret: impl Into<Zeroizing<String>>) -> Self {
        Self(secret.into())
    }

    /// Checks the secret is a well-formed BIP-39 mnemonic.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.0.trim().is_empty() {
            return Err(WalletError::InvalidCredential("credential is empty".to_string()));
        }
        Mnemonic::from_str(self.0.trim())
            .map(|_| ())
            .map_err(|e| WalletError::InvalidCredential(e.to_string()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for WalletCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalletCredential(<redacted>)")
    }
}

/// Parameters registering the token on the issuing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAnnouncement {
    pub token_name: String,
    pub token_ticker: String,
    pub decimals: u8,
    pub max_supply: u64,
    pub is_freezeable: bool,
}

impl From<&ReserveConfig> for TokenAnnouncement {
    fn from(config: &ReserveConfig) -> Self {
        Self {
            token_name: config.token_name().to_string(),
            token_ticker: config.token_ticker().to_string(),
            decimals: config.token_decimals(),
            max_supply: config.max_supply(),
            is_freezeable: config.is_freezeable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Announcement {
    Announced { announcement_id: String },
    /// The wallet already knows this token; nothing was submitted.
    AlreadyAnnounced,
}

#[async_trait]
pub trait IssuerWallet: Send + Sync {
    /// Opens the wallet with `credential` and returns its L1 funding address.
    async fn initialize(&mut self, credential: &WalletCredential) -> Result<String, WalletError>;

    async fn announce_token(
        &mut self,
        announcement: &TokenAnnouncement,
    ) -> Result<Announcement, WalletError>;

    /// Mints `amount` smallest token units and returns the transaction id.
    async fn mint_tokens(&mut self, amount: u128) -> Result<String, WalletError>;
}
