use crate::blockchain::core::state::{ChainSummary, Tally};
use crate::blockchain::core::validation::{validate_chain, validate_payload};
use crate::error::{ChainError, Result};
use crate::miner::{self, MiningLimits, MAX_DIFFICULTY};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Instant;
use tracing::{debug, info};

/// Difficulty used when none is configured.
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Voter id and choice recorded in the genesis block. Never tallied.
pub const GENESIS_MARKER: &str = "genesis";

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

/// A single vote event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePayload {
    pub voter_id: String,
    pub choice: String,
    /// Milliseconds since the Unix epoch at which the vote was cast.
    pub cast_at: u64,
}

impl VotePayload {
    /// Create a payload stamped with the current time.
    pub fn new(voter_id: impl Into<String>, choice: impl Into<String>) -> Self {
        Self::with_time(voter_id, choice, now_millis())
    }

    pub fn with_time(voter_id: impl Into<String>, choice: impl Into<String>, cast_at: u64) -> Self {
        VotePayload {
            voter_id: voter_id.into(),
            choice: choice.into(),
            cast_at,
        }
    }

    pub fn genesis() -> Self {
        Self::new(GENESIS_MARKER, GENESIS_MARKER)
    }

    /// Canonical encoding fed into the block hash: a compact JSON object with
    /// the fixed key order `voterId`, `choice`, `castAt`.
    pub fn canonical_json(&self) -> String {
        format!(
            "{{\"voterId\":{},\"choice\":{},\"castAt\":{}}}",
            serde_json::Value::from(self.voter_id.as_str()),
            serde_json::Value::from(self.choice.as_str()),
            self.cast_at
        )
    }
}

/// Hasher primed with every hashed field except the nonce.
fn prefix_hasher(index: u64, previous_hash: &str, timestamp: u64, payload: &VotePayload) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string());
    hasher.update(previous_hash);
    hasher.update(timestamp.to_string());
    hasher.update(payload.canonical_json());
    hasher
}

fn finish_hash(mut hasher: Sha256, nonce: u64) -> String {
    hasher.update(nonce.to_string());
    hex::encode(hasher.finalize())
}

/// SHA-256 over the decimal index, the previous hash, the decimal timestamp,
/// the canonical payload JSON and the decimal nonce, concatenated in that
/// order. Returns 64 lowercase hex characters.
pub fn content_hash(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    payload: &VotePayload,
    nonce: u64,
) -> String {
    finish_hash(prefix_hasher(index, previous_hash, timestamp, payload), nonce)
}

/// One ledger entry. Fields are read-only outside this crate; the only
/// mutation is the proof-of-work search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    payload: VotePayload,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

impl Block {
    pub fn new(index: u64, timestamp: u64, payload: VotePayload, previous_hash: impl Into<String>) -> Self {
        let previous_hash = previous_hash.into();
        let hash = content_hash(index, &previous_hash, timestamp, &payload, 0);

        Block {
            index,
            timestamp,
            payload,
            previous_hash,
            nonce: 0,
            hash,
        }
    }

    /// Root block of every chain. It is not mined.
    pub fn genesis() -> Self {
        Block::new(0, now_millis(), VotePayload::genesis(), GENESIS_PREVIOUS_HASH)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn payload(&self) -> &VotePayload {
        &self.payload
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Recompute the content hash from the stored fields.
    pub fn calculate_hash(&self) -> String {
        content_hash(self.index, &self.previous_hash, self.timestamp, &self.payload, self.nonce)
    }

    /// Whether the stored hash still matches the stored fields.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Search for a nonce whose hash starts with `difficulty` zero hex digits.
    ///
    /// Runs until a nonce is found. Fails only when `difficulty` exceeds the
    /// hash length, which no nonce can satisfy.
    pub fn mine(&mut self, difficulty: u32) -> Result<()> {
        miner::search(self, difficulty, &MiningLimits::default())
    }

    pub(crate) fn hasher_without_nonce(&self) -> Sha256 {
        prefix_hasher(self.index, &self.previous_hash, self.timestamp, &self.payload)
    }

    pub(crate) fn hash_with_nonce(base: &Sha256, nonce: u64) -> String {
        finish_hash(base.clone(), nonce)
    }

    pub(crate) fn set_proof(&mut self, nonce: u64, hash: String) {
        self.nonce = nonce;
        self.hash = hash;
    }
}

/// The vote ledger: an append-only, hash-linked sequence of blocks rooted at
/// a genesis block.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty: u32,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::with_genesis(DEFAULT_DIFFICULTY)
    }
}

impl Blockchain {
    /// Create a ledger holding only a fresh genesis block.
    pub fn new(difficulty: u32) -> Result<Self> {
        check_difficulty(difficulty)?;
        Ok(Self::with_genesis(difficulty))
    }

    fn with_genesis(difficulty: u32) -> Self {
        let genesis = Block::genesis();
        info!(hash = %genesis.hash(), difficulty, "created genesis block");

        Blockchain {
            blocks: vec![genesis],
            difficulty,
        }
    }

    /// Load an existing sequence of blocks, e.g. an exported chain to audit.
    /// The blocks are taken as-is; call [`Blockchain::verify`] to check them.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Result<Self> {
        check_difficulty(difficulty)?;
        if blocks.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        Ok(Blockchain { blocks, difficulty })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Read-only view of every block, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of recorded votes (every block except genesis).
    pub fn vote_count(&self) -> usize {
        self.blocks.len() - 1
    }

    pub fn latest_block(&self) -> &Block {
        // never empty: every constructor installs a root block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.votes().any(|block| block.payload.voter_id == voter_id)
    }

    /// Mine and append a block recording `payload`.
    ///
    /// Only blank voter ids and choices are rejected; callers are responsible
    /// for eligibility and for enforcing one vote per voter.
    pub fn append(&mut self, payload: VotePayload) -> Result<Block> {
        self.append_with(payload, &MiningLimits::default())
    }

    /// Like [`Blockchain::append`], but mining may be cancelled or time out.
    /// An aborted search leaves the chain untouched.
    pub fn append_with(&mut self, payload: VotePayload, limits: &MiningLimits) -> Result<Block> {
        validate_payload(&payload)?;

        let tip = self.latest_block();
        let candidate = Block::new(tip.index + 1, now_millis(), payload, tip.hash.clone());

        let started = Instant::now();
        let block = miner::mine_block_with(candidate, self.difficulty, limits)?;

        info!(
            index = block.index,
            nonce = block.nonce,
            hash = %block.hash,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "appended block"
        );

        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Check every block's hash and its link to the predecessor.
    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }

    /// Same checks as [`Blockchain::is_valid`], reporting the first failure.
    pub fn verify(&self) -> Result<()> {
        validate_chain(&self.blocks)
    }

    /// Vote counts per choice. Genesis is never counted.
    pub fn results(&self) -> Tally {
        Tally::from_blocks(&self.blocks)
    }

    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            total_blocks: self.block_count(),
            total_votes: self.vote_count(),
            difficulty: self.difficulty,
            latest_hash: self.latest_block().hash.clone(),
            is_valid: self.is_valid(),
        }
    }

    pub fn block_by_index(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.hash == hash)
    }

    pub fn block_by_voter(&self, voter_id: &str) -> Option<&Block> {
        self.votes().find(|block| block.payload.voter_id == voter_id)
    }

    /// Explorer lookup: a block index if `query` parses as one in range,
    /// otherwise an exact hash, otherwise the vote of a voter id.
    pub fn search(&self, query: &str) -> Option<&Block> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(block) = query.parse::<u64>().ok().and_then(|i| self.block_by_index(i)) {
            return Some(block);
        }

        let found = self.block_by_hash(query).or_else(|| self.block_by_voter(query));
        if found.is_none() {
            debug!(query, "no block matched search");
        }
        found
    }

    fn votes(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().skip(1)
    }
}

fn check_difficulty(difficulty: u32) -> Result<()> {
    if difficulty > MAX_DIFFICULTY {
        return Err(ChainError::InvalidConfig(format!(
            "difficulty {} exceeds the maximum of {}",
            difficulty, MAX_DIFFICULTY
        )));
    }
    Ok(())
}
