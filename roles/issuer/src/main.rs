mod args;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use args::Args;
use balance_oracle::BalanceOracleClient;
use reserve_issuer::{
    AuditLog, MintFailure, MintOrchestrator, MintRecord, MintResult, OrchestratorSettings,
    RemoteIssuerWallet, WalletCredential,
};
use shared_config::{hydrate_env_file, load_credential, IssuerGlobalConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Process exit status. Stdout carries only the `MintResult` JSON on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Success = 0,
    StageFailure = 1,
    ConfigError = 2,
}

impl Exit {
    fn of_cycle(outcome: &Result<MintResult, MintFailure>) -> Self {
        match outcome {
            Ok(_) => Exit::Success,
            Err(_) => Exit::StageFailure,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

/// Loads the config file and the wallet credential. Nothing here touches the network.
fn load_config(args: &Args) -> Result<(IssuerGlobalConfig, WalletCredential)> {
    if args.uses_default_config() {
        info!("Using default config path: {}", Args::DEFAULT_CONFIG_PATH);
    }
    let config_path = args
        .config_path
        .to_str()
        .context("Invalid configuration path")?;
    let config = IssuerGlobalConfig::from_path(config_path)
        .with_context(|| format!("Failed to load {config_path}"))?;

    hydrate_env_file()?;
    let credential = load_credential(&config.wallet.credential_env)?;

    Ok((config, WalletCredential::new(credential)))
}

/// Any failure before the first network call is a config error.
fn startup(args: &Args) -> Result<(IssuerGlobalConfig, WalletCredential), Exit> {
    load_config(args).map_err(|e| {
        error!("Failed to load config: {:#}", e);
        eprintln!("{e:#}");
        Exit::ConfigError
    })
}

async fn run(config: IssuerGlobalConfig, credential: WalletCredential) -> Result<Exit> {
    let oracle = BalanceOracleClient::new(
        config.oracle.base_url.clone(),
        Duration::from_secs(config.oracle.timeout_secs),
    )?;
    let wallet = RemoteIssuerWallet::new(
        config.wallet.url.clone(),
        config.network,
        Duration::from_secs(config.wallet.timeout_secs),
    )?;

    info!(
        "Issuing {} on {} at reserve ratio {}",
        config.token.token_ticker(),
        config.network,
        config.token.ratio()
    );
    let mut orchestrator =
        MintOrchestrator::new(OrchestratorSettings::from(&config), oracle, wallet);
    let outcome = orchestrator.run_mint_cycle(&credential).await;

    if let Some(path) = &config.audit_log_path {
        let record = MintRecord::new(&config.token, config.network, &outcome);
        if let Err(e) = AuditLog::new(path).append(&record).await {
            error!("{}", e);
        }
    }

    let exit = Exit::of_cycle(&outcome);
    match outcome {
        Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        Err(failure) => eprintln!("{failure}"),
    }
    Ok(exit)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::from_args() {
        Ok(args) => args,
        Err(usage) => {
            eprintln!("{usage}");
            return Exit::ConfigError.into();
        }
    };
    if args.help {
        println!("{}", Args::HELP_MSG);
        return Exit::Success.into();
    }

    let (config, credential) = match startup(&args) {
        Ok(loaded) => loaded,
        Err(exit) => return exit.into(),
    };

    match run(config, credential).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            error!("{:#}", e);
            Exit::StageFailure.into()
        }
    }
}
