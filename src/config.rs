//! Configuration management for VoteChain
//!
//! Settings come from an optional `config.toml`. Every field has a default,
//! so a missing file or a partial file is fine.

use crate::blockchain::DEFAULT_DIFFICULTY;
use crate::error::ChainError;
use crate::miner::{MiningLimits, MAX_DIFFICULTY};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub election: ElectionConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Upper bound on mining a single block, e.g. `"30s"`. Unbounded when unset.
    #[serde(default, with = "humantime_option")]
    pub mining_timeout: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_timeout: None,
        }
    }
}

impl LedgerConfig {
    pub fn mining_limits(&self) -> MiningLimits {
        MiningLimits {
            cancel: None,
            timeout: self.mining_timeout,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElectionConfig {
    #[serde(default = "default_choices")]
    pub choices: Vec<String>,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            choices: default_choices(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

fn default_choices() -> Vec<String> {
    [
        "Democratic Party",
        "Republican Party",
        "Green Party",
        "Libertarian Party",
        "Independent",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

mod humantime_option {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => humantime::parse_duration(&text)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.ledger.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidConfig(format!(
                "ledger.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.ledger.difficulty
            )));
        }

        if self.election.choices.is_empty() {
            return Err(ChainError::InvalidConfig(
                "election.choices must list at least one choice".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for choice in &self.election.choices {
            if choice.trim().is_empty() {
                return Err(ChainError::InvalidConfig(
                    "election.choices must not contain blank entries".to_string(),
                ));
            }
            if !seen.insert(choice.as_str()) {
                return Err(ChainError::InvalidConfig(format!(
                    "election.choices lists {:?} more than once",
                    choice
                )));
            }
        }

        if self.api.port == 0 {
            return Err(ChainError::InvalidConfig("api.port must not be 0".to_string()));
        }

        Ok(())
    }
}

/// Load `config.toml` from the working directory, using defaults when it
/// does not exist.
pub fn load_config() -> Result<Config, ChainError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config = match fs::read_to_string(path.as_ref()) {
        Ok(text) => toml::from_str::<Config>(&text)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };

    config.validate()?;
    Ok(config)
}
