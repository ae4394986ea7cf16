//! Proof-of-work mining for VoteChain blocks
//!
//! A block is mined by incrementing its nonce until the hex content hash
//! begins with `difficulty` zero characters. The search is unbounded unless
//! [`MiningLimits`] ask for cancellation or a deadline, in which case it is
//! polled every [`CHECK_INTERVAL`] nonces.

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Length of a hex SHA-256 digest; no hash can have more leading zeros.
pub const MAX_DIFFICULTY: u32 = 64;

/// Nonces tried between two checks of the mining limits.
pub const CHECK_INTERVAL: u64 = 1_024;

/// Shared flag used to stop an in-flight search from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Optional bounds on a proof-of-work search. The default has none.
#[derive(Debug, Clone, Default)]
pub struct MiningLimits {
    pub cancel: Option<CancelToken>,
    pub timeout: Option<Duration>,
}

impl MiningLimits {
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn check(&self, started: Instant) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(ChainError::MiningCancelled);
        }
        if let Some(limit) = self.timeout {
            if started.elapsed() >= limit {
                return Err(ChainError::MiningTimeout(limit));
            }
        }
        Ok(())
    }
}

/// Whether `hash` starts with `difficulty` `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    hash.len() >= required && hash.bytes().take(required).all(|b| b == b'0')
}

/// Mine `block` with no limits and hand it back.
pub fn mine_block(block: Block, difficulty: u32) -> Result<Block> {
    mine_block_with(block, difficulty, &MiningLimits::default())
}

/// Mine `block` under `limits`. On cancellation or timeout the block is
/// dropped and the error returned.
pub fn mine_block_with(mut block: Block, difficulty: u32, limits: &MiningLimits) -> Result<Block> {
    search(&mut block, difficulty, limits)?;
    Ok(block)
}

pub(crate) fn search(block: &mut Block, difficulty: u32, limits: &MiningLimits) -> Result<()> {
    if difficulty > MAX_DIFFICULTY {
        return Err(ChainError::InvalidConfig(format!(
            "difficulty {} exceeds the maximum of {}",
            difficulty, MAX_DIFFICULTY
        )));
    }

    if meets_difficulty(block.hash(), difficulty) {
        return Ok(());
    }

    let started = Instant::now();
    let base = block.hasher_without_nonce();
    let mut nonce = block.nonce();

    loop {
        nonce = nonce.wrapping_add(1);
        let hash = Block::hash_with_nonce(&base, nonce);

        if meets_difficulty(&hash, difficulty) {
            debug!(
                index = block.index(),
                nonce,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "found proof of work"
            );
            block.set_proof(nonce, hash);
            return Ok(());
        }

        if nonce % CHECK_INTERVAL == 0 {
            limits.check(started)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::VotePayload;

    fn candidate() -> Block {
        Block::new(1, 1_000, VotePayload::with_time("v1", "A", 999), "ab".repeat(32))
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 0));
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("00ab", 3));
        assert!(!meets_difficulty("0", 2));
    }

    #[test]
    fn test_mine_block_sets_valid_proof() {
        let block = mine_block(candidate(), 3).unwrap();
        assert!(block.hash().starts_with("000"));
        assert!(block.has_valid_hash());
        assert!(block.nonce() > 0);
    }

    #[test]
    fn test_cancelled_search_aborts() {
        let token = CancelToken::new();
        token.cancel();
        let limits = MiningLimits::default().with_cancel(token);

        let result = mine_block_with(candidate(), 12, &limits);
        assert_eq!(result.unwrap_err(), ChainError::MiningCancelled);
    }

    #[test]
    fn test_search_times_out() {
        let limits = MiningLimits::default().with_timeout(Duration::ZERO);
        let result = mine_block_with(candidate(), 12, &limits);
        assert_eq!(result.unwrap_err(), ChainError::MiningTimeout(Duration::ZERO));
    }

    #[test]
    fn test_limits_do_not_affect_easy_blocks() {
        let token = CancelToken::new();
        token.cancel();
        let limits = MiningLimits::default().with_cancel(token);

        // difficulty 0 is satisfied before any limit is consulted
        assert!(mine_block_with(candidate(), 0, &limits).is_ok());
    }
}
