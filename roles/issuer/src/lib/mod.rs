//! Reserve-backed token issuance.
//!
//! Reads the confirmed balance of a custodial Bitcoin address, allocates this
//! issuer's reserve share of it and mints the matching token amount through an
//! external issuer wallet.

pub mod audit;
pub mod error;
pub mod orchestrator;
pub mod reserve_policy;
pub mod wallet;

pub use audit::{AuditLog, MintRecord};
pub use error::{MintFailure, Stage, StageError};
pub use orchestrator::{MintOrchestrator, MintResult, OrchestratorSettings};
pub use reserve_policy::{compute_mint_intent, MintIntent, BASE_UNIT_SCALE};
pub use wallet::{IssuerWallet, RemoteIssuerWallet, WalletCredential, WalletError};
