//! VoteChain - an append-only proof-of-work ledger for votes
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, tallying and chain validation
//! - [`miner`] - Proof-of-work search with cancellation and deadlines
//!
//! ## Application
//! - [`node`] - Shared ledger handle and process composition root
//! - [`voting`] - Vote casting with one-vote-per-voter enforcement
//! - [`api`] - REST API (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```
//! use votechain::blockchain::{Blockchain, VotePayload};
//!
//! let mut chain = Blockchain::new(1).unwrap();
//! chain.append(VotePayload::new("v1", "Green Party")).unwrap();
//!
//! assert!(chain.is_valid());
//! assert_eq!(chain.results().get("Green Party"), 1);
//! ```

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod miner;

// ============================================================================
// Application
// ============================================================================
pub mod node;
pub mod voting;

#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
