//! Error types for VoteChain

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    InvalidVote(String),
    UnknownChoice(String),
    AlreadyVoted(String),
    TamperedBlock { index: u64 },
    InvalidBlockLinkage { index: u64 },
    EmptyChain,
    InvalidGenesis,
    MiningCancelled,
    MiningTimeout(Duration),
    InvalidConfig(String),
    IoError(String),
    Internal(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidVote(msg) => write!(f, "Invalid vote: {}", msg),
            ChainError::UnknownChoice(choice) => write!(f, "Unknown choice: {}", choice),
            ChainError::AlreadyVoted(voter) => write!(f, "Voter {} has already voted", voter),
            ChainError::TamperedBlock { index } => {
                write!(f, "Block {} hash does not match its contents", index)
            }
            ChainError::InvalidBlockLinkage { index } => {
                write!(f, "Block {} does not link to the previous block hash", index)
            }
            ChainError::EmptyChain => write!(f, "Chain has no genesis block"),
            ChainError::InvalidGenesis => {
                write!(f, "First block is not a genesis block at index 0")
            }
            ChainError::MiningCancelled => write!(f, "Mining was cancelled"),
            ChainError::MiningTimeout(limit) => write!(
                f,
                "Mining exceeded the time limit of {}",
                humantime::format_duration(*limit)
            ),
            ChainError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::InvalidConfig(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
