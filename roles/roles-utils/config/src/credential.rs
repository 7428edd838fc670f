use std::env::{self, VarError};
use std::io::ErrorKind;

use tracing::debug;
use zeroize::Zeroizing;

use crate::ConfigError;

/// Set to skip reading `.env`, e.g. under a supervisor that injects the
/// environment itself.
const SKIP_DOTENV_VAR: &str = "ISSUER_SKIP_DOTENV";

/// Loads `.env` from the working directory into the process environment if
/// present. A missing file is not an error.
pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os(SKIP_DOTENV_VAR).is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!("Loaded environment from {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err)),
    }
}

/// Reads the issuer credential from `var`. Absent, blank or non-UTF-8 values
/// are a configuration error so the process stops before any network call.
pub fn load_credential(var: &str) -> Result<Zeroizing<String>, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(Zeroizing::new(value)),
        Ok(_) | Err(VarError::NotPresent) => Err(ConfigError::MissingCredential(var.to_string())),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::CredentialNotUnicode(var.to_string())),
    }
}
