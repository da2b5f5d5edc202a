//! CLI configuration

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pledge_ledger::{Address, Amount, LedgerSettings, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Ledger clock at the start of a run; wall-clock time when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Deployment parameters
    pub ledger: LedgerSettings,

    /// Pre-funded token accounts
    pub accounts: Vec<AccountConfig>,
}

/// A named token account created before the script runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountConfig {
    pub name: String,
    pub balance: Amount,
    /// Allowance granted to the ledger's custody; the full balance when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve: Option<Amount>,
}

impl AccountConfig {
    pub fn address(&self) -> Address {
        Address::derive(&self.name)
    }

    pub fn allowance(&self) -> Amount {
        self.approve.unwrap_or(self.balance)
    }
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Self::parse(&contents)
        } else {
            Ok(CliConfig::default())
        }
    }

    pub fn parse(contents: &str) -> CliResult<Self> {
        toml::from_str(contents).map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> CliResult<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn start_timestamp(&self) -> Timestamp {
        self.start_time
            .map(Timestamp::from_datetime)
            .unwrap_or_else(Timestamp::now)
    }

    /// Resolve a script reference to an address.
    ///
    /// Accepts a role (`admin`, `custody`, `treasury`, `token`), a configured
    /// account name, or a `0x` address.
    pub fn resolve(&self, name: &str) -> CliResult<Address> {
        match name {
            "admin" => return Ok(self.ledger.admin),
            "custody" => return Ok(self.ledger.custody),
            "treasury" => return Ok(self.ledger.treasury),
            "token" => return Ok(self.ledger.token),
            _ => {}
        }
        if let Some(account) = self.accounts.iter().find(|a| a.name == name) {
            return Ok(account.address());
        }
        if name.starts_with("0x") {
            return name
                .parse()
                .map_err(|e| CliError::InvalidInput(format!("{name}: {e}")));
        }
        Err(CliError::InvalidInput(format!("unknown account '{name}'")))
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("pledge").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_ledger::ONE_UNIT;

    const SAMPLE: &str = r#"
start_time = "2025-06-15T12:00:00Z"

[ledger]
base_fee = 2000000
min_amount = 5000000

[[accounts]]
name = "alice"
balance = 100000000

[[accounts]]
name = "bob"
balance = 50000000
approve = 10000000
"#;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.start_time.is_none());
        assert!(config.accounts.is_empty());
        assert_eq!(config.ledger, LedgerSettings::default());
    }

    #[test]
    fn test_load_missing_config() {
        let config = CliConfig::load(Some("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_parse_partial_ledger_table() {
        let config = CliConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.ledger.base_fee, 2 * ONE_UNIT);
        assert_eq!(config.ledger.min_amount, 5 * ONE_UNIT);
        assert_eq!(config.ledger.max_amount, LedgerSettings::default().max_amount);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].allowance(), 100 * ONE_UNIT);
        assert_eq!(config.accounts[1].allowance(), 10 * ONE_UNIT);
        assert_eq!(config.start_timestamp().as_secs(), 1_749_988_800);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("pledge-cli-config-{}.toml", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();
        let config = CliConfig::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config, CliConfig::parse(SAMPLE).unwrap());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = CliConfig::parse("[ledger]\nbase_fee = \"lots\"").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CliConfig::parse(SAMPLE).unwrap();
        let rendered = config.to_toml().unwrap();
        assert_eq!(CliConfig::parse(&rendered).unwrap(), config);
    }

    #[test]
    fn test_resolve_references() {
        let config = CliConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.resolve("admin").unwrap(), config.ledger.admin);
        assert_eq!(config.resolve("treasury").unwrap(), config.ledger.treasury);
        assert_eq!(config.resolve("alice").unwrap(), Address::derive("alice"));

        let raw = Address::derive("elsewhere");
        assert_eq!(config.resolve(&raw.to_string()).unwrap(), raw);

        assert!(matches!(config.resolve("mallory"), Err(CliError::InvalidInput(_))));
        assert!(matches!(config.resolve("0x12"), Err(CliError::InvalidInput(_))));
    }
}
