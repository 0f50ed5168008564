//! Configuration for the ledger and its HTTP server

use serde::Deserialize;
use thiserror::Error;

use std::fs;
use std::path::Path;

use crate::blockchain::amount::Amount;
use crate::blockchain::chain::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};

/// Largest difficulty a SHA-256 hex digest can satisfy
pub const MAX_DIFFICULTY: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid difficulty {0}: must be between 1 and 64")]
    InvalidDifficulty(usize),

    #[error("Mining reward must be greater than zero")]
    ZeroMiningReward,

    #[error("Server port must not be 0")]
    InvalidPort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// In minor units
    #[serde(default = "default_mining_reward")]
    pub mining_reward: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_mining_reward() -> Amount {
    DEFAULT_MINING_REWARD
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl LedgerConfig {
    /// Reads and validates a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates TOML config; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_DIFFICULTY).contains(&self.chain.difficulty) {
            return Err(ConfigError::InvalidDifficulty(self.chain.difficulty));
        }

        if self.chain.mining_reward.is_zero() {
            return Err(ConfigError::ZeroMiningReward);
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        Ok(())
    }

    /// `host:port` the HTTP server binds to
    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();

        assert_eq!(config.chain.difficulty, 2);
        assert_eq!(config.chain.mining_reward, Amount::coins(100));
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 8080));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = LedgerConfig::from_toml_str(
            r#"
            [chain]
            difficulty = 4

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.chain.difficulty, 4);
        assert_eq!(config.chain.mining_reward, Amount::coins(100));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_mining_reward_in_minor_units() {
        let config = LedgerConfig::from_toml_str("[chain]\nmining_reward = 1250\n").unwrap();
        assert_eq!(config.chain.mining_reward, Amount::from_minor(1_250));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            LedgerConfig::from_toml_str("[chain]\ndifficulty = 0\n"),
            Err(ConfigError::InvalidDifficulty(0))
        ));
        assert!(matches!(
            LedgerConfig::from_toml_str("[chain]\ndifficulty = 65\n"),
            Err(ConfigError::InvalidDifficulty(65))
        ));
        assert!(matches!(
            LedgerConfig::from_toml_str("[chain]\nmining_reward = 0\n"),
            Err(ConfigError::ZeroMiningReward)
        ));
        assert!(matches!(
            LedgerConfig::from_toml_str("[server]\nport = 0\n"),
            Err(ConfigError::InvalidPort)
        ));
        assert!(matches!(
            LedgerConfig::from_toml_str("[chain]\ndifficulty = \"two\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            LedgerConfig::from_toml_str("[chain]\nreward = 5\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\ndifficulty = 3").unwrap();

        let config = LedgerConfig::load(file.path()).unwrap();
        assert_eq!(config.chain.difficulty, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = LedgerConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
