//! Mint cycle: wallet init, balance read, token announcement, mint.
//!
//! Stages run strictly in order and each awaits its external call before the
//! next begins. Nothing is retried; a caller wanting periodic mints schedules
//! repeated cycles.
//!
//! Cycles against the same credential must be serialized by the caller. The
//! balance read in BalanceCheck is not re-checked before Mint, so two
//! overlapping cycles can both mint against a balance that has since shrunk.

use std::time::{SystemTime, UNIX_EPOCH};

use balance_oracle::{BalanceReading, BalanceSource};
use bitcoin::Amount;
use serde::Serialize;
use shared_config::{IssuerGlobalConfig, ReserveConfig};
use tracing::{error, info, warn};

use crate::error::{MintFailure, StageError};
use crate::reserve_policy::{compute_mint_intent, MintIntent};
use crate::wallet::{Announcement, IssuerWallet, TokenAnnouncement, WalletCredential};

/// Successful outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintResult {
    /// `None` when the allocation floored to zero token units and nothing
    /// was submitted.
    pub mint_tx_id: Option<String>,
    pub amount_base_units: u64,
    pub amount_token_units: u128,
    /// Unix seconds.
    pub succeeded_at: u64,
    pub custody_address: String,
    pub observed_balance_sats: u64,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub reserve: ReserveConfig,
    /// Address to read the backing balance from; the wallet's funding
    /// address when `None`.
    pub custody_address: Option<String>,
}

impl From<&IssuerGlobalConfig> for OrchestratorSettings {
    fn from(config: &IssuerGlobalConfig) -> Self {
        Self {
            reserve: config.token.clone(),
            custody_address: config.custody_address.clone(),
        }
    }
}

pub struct MintOrchestrator<O, W> {
    settings: OrchestratorSettings,
    oracle: O,
    wallet: W,
}

impl<O, W> MintOrchestrator<O, W>
where
    O: BalanceSource,
    W: IssuerWallet,
{
    pub fn new(settings: OrchestratorSettings, oracle: O, wallet: W) -> Self {
        Self {
            settings,
            oracle,
            wallet,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Runs one complete cycle and returns exactly one outcome.
    pub async fn run_mint_cycle(
        &mut self,
        credential: &WalletCredential,
    ) -> Result<MintResult, MintFailure> {
        let ticker = self.settings.reserve.token_ticker().to_string();
        info!("Starting mint cycle for {}", ticker);
        match self.run_stages(credential).await {
            Ok(result) => {
                info!(
                    "Mint cycle for {} complete: {} token units, tx {}",
                    ticker,
                    result.amount_token_units,
                    result.mint_tx_id.as_deref().unwrap_or("<none>")
                );
                Ok(result)
            }
            Err(e) => {
                let failure = MintFailure::from(e);
                error!("Mint cycle for {} failed at {}: {}", ticker, failure.stage, failure.reason);
                Err(failure)
            }
        }
    }

    async fn run_stages(&mut self, credential: &WalletCredential) -> Result<MintResult, StageError> {
        let funding_address = self.wallet_init(credential).await?;
        let reading = self.balance_check(&funding_address).await?;
        self.announce().await?;
        self.mint(&reading).await
    }

    async fn wallet_init(&mut self, credential: &WalletCredential) -> Result<String, StageError> {
        credential.validate().map_err(StageError::WalletInit)?;
        let funding_address = self
            .wallet
            .initialize(credential)
            .await
            .map_err(StageError::WalletInit)?;
        info!("Wallet initialized, L1 funding address: {}", funding_address);
        Ok(funding_address)
    }

    async fn balance_check(&self, funding_address: &str) -> Result<BalanceReading, StageError> {
        let address = self
            .settings
            .custody_address
            .as_deref()
            .unwrap_or(funding_address);
        let reading = self
            .oracle
            .fetch_confirmed_balance(address)
            .await
            .map_err(StageError::BalanceCheck)?;
        info!(
            "Confirmed balance at {}: {} sats ({})",
            reading.address,
            reading.confirmed_balance_sats,
            Amount::from_sat(reading.confirmed_balance_sats)
        );
        Ok(reading)
    }

    async fn announce(&mut self) -> Result<Announcement, StageError> {
        let announcement = TokenAnnouncement::from(&self.settings.reserve);
        info!(
            "Announcing token {} ({}), decimals {}, max supply {}, freezeable {}",
            announcement.token_name,
            announcement.token_ticker,
            announcement.decimals,
            announcement.max_supply,
            announcement.is_freezeable
        );
        let outcome = self
            .wallet
            .announce_token(&announcement)
            .await
            .map_err(StageError::Announce)?;
        match &outcome {
            Announcement::Announced { announcement_id } => {
                info!("Token {} announced: {}", announcement.token_ticker, announcement_id);
            }
            Announcement::AlreadyAnnounced => {
                info!("Token {} already announced, skipping", announcement.token_ticker);
            }
        }
        Ok(outcome)
    }

    async fn mint(&mut self, reading: &BalanceReading) -> Result<MintResult, StageError> {
        let intent = compute_mint_intent(reading, &self.settings.reserve);
        info!(
            "Allocating {} of {} sats: {} sats ({}) -> {} token units",
            intent.policy_ratio,
            reading.confirmed_balance_sats,
            intent.base_units_allocated,
            Amount::from_sat(intent.base_units_allocated),
            intent.token_units
        );

        if intent.token_units == 0 {
            warn!("Allocation rounds to zero token units, nothing to mint");
            return Ok(mint_result(None, &intent, reading));
        }

        let tx_id = self
            .wallet
            .mint_tokens(intent.token_units)
            .await
            .map_err(StageError::Mint)?;
        info!("Minted {} token units, transaction {}", intent.token_units, tx_id);
        Ok(mint_result(Some(tx_id), &intent, reading))
    }
}

fn mint_result(mint_tx_id: Option<String>, intent: &MintIntent, reading: &BalanceReading) -> MintResult {
    MintResult {
        mint_tx_id,
        amount_base_units: intent.base_units_allocated,
        amount_token_units: intent.token_units,
        succeeded_at: unix_timestamp(),
        custody_address: reading.address.clone(),
        observed_balance_sats: reading.confirmed_balance_sats,
    }
}

pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
