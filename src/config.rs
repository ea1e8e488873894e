//! Configuration management for SigLedger

use crate::error::LedgerError;
use crate::ledger::LedgerPolicy;
use crate::signature::SchemeKind;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    #[serde(default)]
    pub scheme: SchemeKind,
    #[serde(default)]
    pub require_sufficient_balance: bool,
    #[serde(default)]
    pub require_nonce: bool,
}

impl LedgerConfig {
    pub fn policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            require_sufficient_balance: self.require_sufficient_balance,
            require_nonce: self.require_nonce,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SeedConfig {
    #[serde(default = "default_wallets")]
    pub wallets: usize,
    #[serde(default = "default_initial_balance")]
    pub initial_balance: i64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            wallets: default_wallets(),
            initial_balance: default_initial_balance(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3042
}

fn default_wallets() -> usize {
    3
}

fn default_initial_balance() -> i64 {
    100
}

impl Config {
    pub fn from_toml(config_str: &str) -> Result<Self, LedgerError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LedgerError> {
        if self.server.host.trim().is_empty() {
            return Err(LedgerError::ConfigError("server.host must not be empty".into()));
        }
        if self.seed.initial_balance < 0 {
            return Err(LedgerError::ConfigError(
                "seed.initial_balance must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load_config_from(path: &Path) -> Result<Config, LedgerError> {
    match fs::read_to_string(path) {
        Ok(config_str) if config_str.trim().is_empty() => Ok(Config::default()),
        Ok(config_str) => Config::from_toml(&config_str),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

pub fn load_config() -> Result<Config, LedgerError> {
    load_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 3042);
        assert_eq!(config.ledger.scheme, SchemeKind::Recovery);
        assert_eq!(config.ledger.policy(), LedgerPolicy::default());
        assert_eq!(config.seed.wallets, 3);
        assert_eq!(config.seed.initial_balance, 100);
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ledger]\nscheme = \"public-key\"\nrequire_nonce = true\n\n[server]\nport = 8080"
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ledger.scheme, SchemeKind::PublicKey);
        assert!(config.ledger.require_nonce);
        assert!(!config.ledger.require_sufficient_balance);
        assert_eq!(config.seed, SeedConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml("[ledger]\nscheme = \"rsa\""),
            Err(LedgerError::ConfigError(_))
        ));
        assert!(matches!(
            Config::from_toml("[seed]\ninitial_balance = -1"),
            Err(LedgerError::ConfigError(_))
        ));
        assert!(matches!(
            Config::from_toml("[server]\nhost = \"\""),
            Err(LedgerError::ConfigError(_))
        ));
    }
}
