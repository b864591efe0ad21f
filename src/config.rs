//! Configuration: per-account declarations and global settings.
//!
//! The configuration is a YAML file located through the
//! `CHAINKEEPER_CONFIG` environment variable (or an explicit path). All
//! of it is read-only input to the engine.

use crate::domain::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path of the hand-maintained chains database.
    pub chains_db: PathBuf,
    /// Directory receiving the transactions and chains artifacts.
    pub output_dir: PathBuf,
    /// Declared broker accounts.
    pub accounts: Vec<AccountConfig>,
    /// Optional CSV of (symbol, price) quotes for marking open inventory.
    #[serde(default)]
    pub prices: Option<PathBuf>,
    #[serde(default)]
    pub settings: Settings,
}

/// One declared broker account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Short name used as the account id throughout the ledger.
    pub nickname: String,
    /// Broker log flavor, informational only.
    #[serde(default)]
    pub logtype: Option<String>,
    /// Source registry tag selecting the parser for this account.
    pub module: String,
    /// Path of the exported transaction file.
    pub path: PathBuf,
    /// Optional starting-position file synthesized into opening rows.
    #[serde(default)]
    pub initial_positions: Option<PathBuf>,
}

/// Global engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default win fraction when a chain has no explicit `target`.
    pub win_target_default: Decimal,
    /// Futures option root to future root (month mapping) for family
    /// grouping, e.g. OZC -> ZC.
    pub futures_roots: HashMap<String, String>,
    /// Futures contract multipliers keyed by root, e.g. CL -> 1000.
    pub futures_multipliers: HashMap<String, Decimal>,
    /// Read-only asset mapping: underlying to asset class label.
    pub asset_classes: HashMap<String, String>,
    /// Presentation groups excluded from the chains summary artifact.
    pub group_exclusions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            win_target_default: Decimal::from_str_canonical("0.5").expect("static literal"),
            futures_roots: HashMap::new(),
            futures_multipliers: HashMap::new(),
            asset_classes: HashMap::new(),
            group_exclusions: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the path named by `CHAINKEEPER_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("CHAINKEEPER_CONFIG")
            .map_err(|_| ConfigError::MissingEnv("CHAINKEEPER_CONFIG".to_string()))?;
        Self::load(Path::new(&path))
    }

    /// Load configuration from an explicit path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = "\
chains_db: chains.yaml
output_dir: out
accounts:
  - nickname: main
    module: norm_csv
    path: main.csv
";

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].nickname, "main");
        assert!(config.accounts[0].initial_positions.is_none());
        assert_eq!(
            config.settings.win_target_default,
            Decimal::from_str_canonical("0.5").unwrap()
        );
        assert!(config.settings.group_exclusions.is_empty());
    }

    #[test]
    fn test_settings_override() {
        let yaml = format!(
            "{}settings:\n  win_target_default: 0.25\n  futures_multipliers:\n    CL: 1000\n  group_exclusions: [scalps]\n",
            MINIMAL
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            config.settings.win_target_default,
            Decimal::from_str_canonical("0.25").unwrap()
        );
        assert_eq!(
            config.settings.futures_multipliers.get("CL"),
            Some(&Decimal::from_i64(1000))
        );
        assert_eq!(config.settings.group_exclusions, vec!["scalps"]);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"accounts: not-a-list").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/chainkeeper.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
