//! Client for an external balance-reporting service.
//!
//! The oracle speaks the blockchain.info `balance` shape:
//! `GET /balance?active=<addr>` answers with a JSON object keyed by address,
//! each entry carrying a `final_balance` in satoshis. Every call is a live
//! read; nothing is cached and nothing is retried.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("custody address is empty")]
    EmptyAddress,
    #[error("balance oracle unavailable: HTTP {status}")]
    Unavailable { status: u16 },
    #[error("malformed balance oracle response: {0}")]
    MalformedResponse(String),
    #[error("balance oracle transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Confirmed balance of one address at the moment it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReading {
    pub address: String,
    pub confirmed_balance_sats: u64,
    /// Unix seconds.
    pub observed_at: u64,
}

/// Anything that can report a confirmed on-chain balance.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_confirmed_balance(&self, address: &str) -> Result<BalanceReading, OracleError>;
}

#[derive(Debug, Deserialize)]
struct AddressBalance {
    final_balance: u64,
}

#[derive(Debug, Clone)]
pub struct BalanceOracleClient {
    base_url: String,
    client: reqwest::Client,
}

impl BalanceOracleClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BalanceSource for BalanceOracleClient {
    async fn fetch_confirmed_balance(&self, address: &str) -> Result<BalanceReading, OracleError> {
        if address.is_empty() {
            return Err(OracleError::EmptyAddress);
        }

        let url = format!("{}/balance", self.base_url);
        debug!("GET {}?active={}", url, address);
        let response = self
            .client
            .get(&url)
            .query(&[("active", address)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Unavailable {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let confirmed_balance_sats = parse_balance(&body, address)?;
        info!("Oracle reports {} sats at {}", confirmed_balance_sats, address);

        Ok(BalanceReading {
            address: address.to_string(),
            confirmed_balance_sats,
            observed_at: unix_timestamp(),
        })
    }
}

fn parse_balance(body: &str, address: &str) -> Result<u64, OracleError> {
    let mut entries: HashMap<String, serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| OracleError::MalformedResponse(format!("invalid JSON body: {}", e)))?;
    let entry = entries.remove(address).ok_or_else(|| {
        OracleError::MalformedResponse(format!("address {} not found in response", address))
    })?;
    let balance: AddressBalance = serde_json::from_value(entry).map_err(|e| {
        OracleError::MalformedResponse(format!("bad entry for {}: {}", address, e))
    })?;
    Ok(balance.final_balance)
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
