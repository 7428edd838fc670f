//! Append-only record of mint cycle outcomes, one JSON object per line.

use std::path::{Path, PathBuf};

use bitcoin::Network;
use serde::Serialize;
use shared_config::{ReserveConfig, ReserveRatio};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MintFailure, Stage};
use crate::orchestrator::{unix_timestamp, MintResult};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write audit log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Minted(MintResult),
    Failed { stage: Stage, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MintRecord {
    pub ticker: String,
    pub network: Network,
    pub ratio: ReserveRatio,
    pub recorded_at: u64,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

impl MintRecord {
    pub fn new(
        config: &ReserveConfig,
        network: Network,
        outcome: &Result<MintResult, MintFailure>,
    ) -> Self {
        let outcome = match outcome {
            Ok(result) => RecordOutcome::Minted(result.clone()),
            Err(failure) => RecordOutcome::Failed {
                stage: failure.stage,
                reason: failure.reason.clone(),
            },
        };
        Self {
            ticker: config.token_ticker().to_string(),
            network,
            ratio: config.ratio(),
            recorded_at: unix_timestamp(),
            outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &MintRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let write_err = |source| AuditError::Write {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;
        file.write_all(line.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;

        debug!("Appended {} record to {}", record.ticker, self.path.display());
        Ok(())
    }
}
