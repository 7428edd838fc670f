use std::fmt;

use balance_oracle::OracleError;
use serde::Serialize;
use thiserror::Error;

use crate::wallet::WalletError;

/// Where a mint cycle stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    WalletInit,
    BalanceCheck,
    Announce,
    Mint,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::WalletInit => "WalletInit",
            Stage::BalanceCheck => "BalanceCheck",
            Stage::Announce => "Announce",
            Stage::Mint => "Mint",
        };
        f.write_str(name)
    }
}

/// Underlying cause of a stage failure.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    WalletInit(WalletError),
    #[error(transparent)]
    BalanceCheck(OracleError),
    #[error(transparent)]
    Announce(WalletError),
    #[error(transparent)]
    Mint(WalletError),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::WalletInit(_) => Stage::WalletInit,
            StageError::BalanceCheck(_) => Stage::BalanceCheck,
            StageError::Announce(_) => Stage::Announce,
            StageError::Mint(_) => Stage::Mint,
        }
    }
}

/// The single failure outcome of a mint cycle.
#[derive(Debug, Error)]
#[error("mint cycle failed at {stage}: {reason}")]
pub struct MintFailure {
    pub stage: Stage,
    pub reason: String,
    #[source]
    pub source: StageError,
}

impl From<StageError> for MintFailure {
    fn from(source: StageError) -> Self {
        Self {
            stage: source.stage(),
            reason: source.to_string(),
            source,
        }
    }
}
