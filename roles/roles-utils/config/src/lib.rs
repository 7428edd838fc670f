use std::path::PathBuf;

use bitcoin::Network;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

mod credential;
mod ratio;

pub use credential::{hydrate_env_file, load_credential};
pub use ratio::ReserveRatio;

/// Token amounts are computed in `u128`; more decimals than this could
/// overflow for the largest balances.
pub const MAX_TOKEN_DECIMALS: u8 = 18;

pub const DEFAULT_CREDENTIAL_ENV: &str = "ISSUER_MNEMONIC";
pub const DEFAULT_ORACLE_URL: &str = "https://blockchain.info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid reserve ratio `{0}`")]
    InvalidRatio(String),
    #[error("reserve ratio {0} is outside (0, 1]")]
    RatioOutOfRange(String),
    #[error("token decimals {0} exceeds the maximum of 18")]
    TooManyDecimals(u8),
    #[error("max supply must be positive")]
    ZeroMaxSupply,
    #[error("`{0}` must not be empty")]
    EmptyField(&'static str),
    #[error("configured reserve ratios sum to {numerator}/{denominator}, more than the whole balance")]
    OverAllocated { numerator: u128, denominator: u128 },
    #[error("the sum of {0} configured reserve ratios has a denominator beyond 128 bits")]
    AllocationSumOverflow(usize),
    #[error("missing required environment variable `{0}`")]
    MissingCredential(String),
    #[error("environment variable `{0}` is not valid UTF-8")]
    CredentialNotUnicode(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// Token parameters and the share of the custodial balance this issuer
/// mints against. Every value of this type has passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawReserveConfig")]
pub struct ReserveConfig {
    ratio: ReserveRatio,
    token_decimals: u8,
    token_name: String,
    token_ticker: String,
    max_supply: u64,
    is_freezeable: bool,
}

#[derive(Deserialize)]
struct RawReserveConfig {
    name: String,
    ticker: String,
    decimals: u8,
    max_supply: u64,
    #[serde(default)]
    is_freezeable: bool,
    reserve_ratio: ReserveRatio,
}

impl TryFrom<RawReserveConfig> for ReserveConfig {
    type Error = ConfigError;

    fn try_from(raw: RawReserveConfig) -> Result<Self, Self::Error> {
        ReserveConfig::new(
            raw.reserve_ratio,
            raw.decimals,
            raw.name,
            raw.ticker,
            raw.max_supply,
            raw.is_freezeable,
        )
    }
}

impl ReserveConfig {
    pub fn new(
        ratio: ReserveRatio,
        token_decimals: u8,
        token_name: impl Into<String>,
        token_ticker: impl Into<String>,
        max_supply: u64,
        is_freezeable: bool,
    ) -> Result<Self, ConfigError> {
        let token_name = token_name.into();
        let token_ticker = token_ticker.into();
        if token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ConfigError::TooManyDecimals(token_decimals));
        }
        if max_supply == 0 {
            return Err(ConfigError::ZeroMaxSupply);
        }
        if token_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("token.name"));
        }
        if token_ticker.trim().is_empty() {
            return Err(ConfigError::EmptyField("token.ticker"));
        }
        Ok(Self {
            ratio,
            token_decimals,
            token_name,
            token_ticker,
            max_supply,
            is_freezeable,
        })
    }

    pub fn ratio(&self) -> ReserveRatio {
        self.ratio
    }

    pub fn token_decimals(&self) -> u8 {
        self.token_decimals
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn token_ticker(&self) -> &str {
        &self.token_ticker
    }

    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    pub fn is_freezeable(&self) -> bool {
        self.is_freezeable
    }
}

/// Another issuer drawing on the same custodial balance.
#[derive(Debug, Deserialize, Clone)]
pub struct PeerAllocation {
    pub name: String,
    pub ticker: String,
    pub reserve_ratio: ReserveRatio,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_url")]
    pub base_url: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_oracle_url(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletConfig {
    pub url: String,
    #[serde(default = "default_credential_env")]
    pub credential_env: String,
    #[serde(default = "default_wallet_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IssuerGlobalConfig {
    pub network: Network,
    /// Address whose balance backs the token. Falls back to the issuer
    /// wallet's funding address when unset.
    pub custody_address: Option<String>,
    pub audit_log_path: Option<PathBuf>,
    #[serde(default)]
    pub oracle: OracleConfig,
    pub wallet: WalletConfig,
    pub token: ReserveConfig,
    #[serde(default)]
    pub peer_allocations: Vec<PeerAllocation>,
}

impl IssuerGlobalConfig {
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        Self::from_source(File::new(path, FileFormat::Toml))
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::from_source(File::from_str(toml, FileFormat::Toml))
    }

    fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Self = Config::builder().add_source(source).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.custody_address.as_deref(), Some(a) if a.trim().is_empty()) {
            return Err(ConfigError::EmptyField("custody_address"));
        }
        if self.oracle.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyField("oracle.base_url"));
        }
        if self.wallet.url.trim().is_empty() {
            return Err(ConfigError::EmptyField("wallet.url"));
        }
        if self.wallet.credential_env.trim().is_empty() {
            return Err(ConfigError::EmptyField("wallet.credential_env"));
        }

        let ratios = std::iter::once(self.token.ratio())
            .chain(self.peer_allocations.iter().map(|p| p.reserve_ratio));
        match ReserveRatio::checked_sum(ratios) {
            Some((numerator, denominator)) if numerator <= denominator => Ok(()),
            Some((numerator, denominator)) => Err(ConfigError::OverAllocated {
                numerator,
                denominator,
            }),
            None => Err(ConfigError::AllocationSumOverflow(
                self.peer_allocations.len() + 1,
            )),
        }
    }
}

fn default_oracle_url() -> String {
    DEFAULT_ORACLE_URL.to_string()
}

fn default_oracle_timeout() -> u64 {
    30
}

fn default_wallet_timeout() -> u64 {
    60
}

fn default_credential_env() -> String {
    DEFAULT_CREDENTIAL_ENV.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        network = "regtest"
        custody_address = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh"
        audit_log_path = "mint-audit.jsonl"

        [oracle]
        base_url = "https://blockchain.info"
        timeout_secs = 10

        [wallet]
        url = "http://127.0.0.1:8787"

        [token]
        name = "US Gov Stablecoin BTC"
        ticker = "USBTC"
        decimals = 6
        max_supply = 1000000000
        is_freezeable = false
        reserve_ratio = "34%"

        [[peer_allocations]]
        name = "Internet Computer Federal Reserve Bank"
        ticker = "ckBTC"
        reserve_ratio = "33%"

        [[peer_allocations]]
        name = "Wrapped Bitcoin Federal Reserve Bank"
        ticker = "WBTC"
        reserve_ratio = "33%"
    "#;

    #[test]
    fn test_load_sample_config() {
        let config = IssuerGlobalConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.network, Network::Regtest);
        assert_eq!(
            config.custody_address.as_deref(),
            Some("bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh")
        );
        assert_eq!(config.oracle.timeout_secs, 10);
        assert_eq!(config.wallet.credential_env, DEFAULT_CREDENTIAL_ENV);
        assert_eq!(config.wallet.timeout_secs, 60);
        assert_eq!(config.token.token_ticker(), "USBTC");
        assert_eq!(config.token.token_decimals(), 6);
        assert_eq!(config.token.max_supply(), 1_000_000_000);
        assert_eq!(config.token.ratio(), ReserveRatio::new(17, 50).unwrap());
        assert_eq!(config.peer_allocations.len(), 2);
    }

    #[test]
    fn test_oracle_section_is_optional() {
        let toml = SAMPLE.replace(
            "[oracle]\n        base_url = \"https://blockchain.info\"\n        timeout_secs = 10\n",
            "",
        );
        let config = IssuerGlobalConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.oracle.base_url, DEFAULT_ORACLE_URL);
        assert_eq!(config.oracle.timeout_secs, 30);
    }

    #[test]
    fn test_rejects_over_allocation() {
        let toml = SAMPLE.replace("reserve_ratio = \"34%\"", "reserve_ratio = \"35%\"");
        let err = IssuerGlobalConfig::from_toml_str(&toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::OverAllocated { numerator: 101, denominator: 100 }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unrepresentable_ratio_sum_names_the_combination() {
        // pairwise coprime denominators 2^40, 3^25, 5^17, 7^14; their product exceeds u128
        let toml = SAMPLE
            .replace("reserve_ratio = \"34%\"", "reserve_ratio = \"1/1099511627776\"")
            .replacen("reserve_ratio = \"33%\"", "reserve_ratio = \"1/847288609443\"", 1)
            .replacen("reserve_ratio = \"33%\"", "reserve_ratio = \"1/762939453125\"", 1)
            + r#"
        [[peer_allocations]]
        name = "Lightning Reserve Bank"
        ticker = "LNBTC"
        reserve_ratio = "1/678223072849"
        "#;
        let err = IssuerGlobalConfig::from_toml_str(&toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::AllocationSumOverflow(4)),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_rejects_ratio_out_of_range() {
        let toml = SAMPLE.replace("reserve_ratio = \"34%\"", "reserve_ratio = \"0%\"");
        assert!(IssuerGlobalConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_rejects_excess_decimals() {
        let toml = SAMPLE.replace("decimals = 6", "decimals = 19");
        assert!(IssuerGlobalConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_rejects_empty_custody_address() {
        let toml = SAMPLE.replace(
            "custody_address = \"bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh\"",
            "custody_address = \"\"",
        );
        let err = IssuerGlobalConfig::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyField("custody_address")));
    }

    #[test]
    fn test_reserve_config_new_validates() {
        let ratio = ReserveRatio::new(17, 50).unwrap();
        assert!(matches!(
            ReserveConfig::new(ratio, 6, "Token", "TKN", 0, false),
            Err(ConfigError::ZeroMaxSupply)
        ));
        assert!(matches!(
            ReserveConfig::new(ratio, 6, " ", "TKN", 1, false),
            Err(ConfigError::EmptyField("token.name"))
        ));
        assert!(ReserveConfig::new(ratio, MAX_TOKEN_DECIMALS, "Token", "TKN", 1, true).is_ok());
    }
}
