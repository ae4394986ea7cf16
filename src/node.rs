//! Shared ledger access and process composition root.
//!
//! One [`Blockchain`] exists per process. It is wrapped in a [`LedgerHandle`]
//! that every component receives by clone; there is no global instance.

use crate::blockchain::{Block, Blockchain, ChainSummary, Tally, VotePayload};
use crate::config::{load_config, Config};
use crate::error::{ChainError, Result};
use crate::miner::MiningLimits;
use crate::voting::VotingBooth;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Cloneable handle to the process-wide ledger.
///
/// Appends hold the write lock from reading the tip until the mined block is
/// pushed, so they are strictly serialized and readers never see a block
/// before it is complete.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    inner: Arc<RwLock<Blockchain>>,
}

impl LedgerHandle {
    pub fn new(chain: Blockchain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    pub fn with_difficulty(difficulty: u32) -> Result<Self> {
        Ok(Self::new(Blockchain::new(difficulty)?))
    }

    pub fn append(&self, payload: VotePayload) -> Result<Block> {
        self.inner.write().append(payload)
    }

    pub fn append_with(&self, payload: VotePayload, limits: &MiningLimits) -> Result<Block> {
        self.inner.write().append_with(payload, limits)
    }

    /// Run [`LedgerHandle::append_with`] on the blocking thread pool so async
    /// callers do not stall the runtime while mining.
    pub async fn append_async(&self, payload: VotePayload, limits: MiningLimits) -> Result<Block> {
        let handle = self.clone();
        tokio::task::spawn_blocking(move || handle.append_with(payload, &limits))
            .await
            .map_err(|e| ChainError::Internal(format!("mining task failed: {}", e)))?
    }

    /// Run `f` with exclusive access, e.g. to check and append atomically.
    pub fn with_write<T>(&self, f: impl FnOnce(&mut Blockchain) -> T) -> T {
        f(&mut self.inner.write())
    }

    pub fn with_read<T>(&self, f: impl FnOnce(&Blockchain) -> T) -> T {
        f(&self.inner.read())
    }

    /// [`LedgerHandle::with_read`] for async callers. The read lock is taken
    /// on the blocking pool, so waiting out an append in progress suspends
    /// the task and leaves the runtime's worker threads free.
    pub async fn read_async<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Blockchain) -> T + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.clone();
        tokio::task::spawn_blocking(move || handle.with_read(f))
            .await
            .map_err(|e| ChainError::Internal(format!("ledger read task failed: {}", e)))
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.inner.read().has_voted(voter_id)
    }

    pub fn results(&self) -> Tally {
        self.inner.read().results()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.read().is_valid()
    }

    pub fn verify(&self) -> Result<()> {
        self.inner.read().verify()
    }

    pub fn latest_block(&self) -> Block {
        self.inner.read().latest_block().clone()
    }

    pub fn difficulty(&self) -> u32 {
        self.inner.read().difficulty()
    }

    pub fn block_count(&self) -> usize {
        self.inner.read().block_count()
    }

    /// Copy of every block, genesis first.
    pub fn snapshot(&self) -> Vec<Block> {
        self.inner.read().blocks().to_vec()
    }

    pub fn block_by_index(&self, index: u64) -> Option<Block> {
        self.inner.read().block_by_index(index).cloned()
    }

    pub fn search(&self, query: &str) -> Option<Block> {
        self.inner.read().search(query).cloned()
    }

    pub fn summary(&self) -> ChainSummary {
        self.inner.read().summary()
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides `default_level`.
/// Calling it again is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything a running VoteChain process needs, built once at startup.
pub struct Node {
    pub config: Config,
    pub ledger: LedgerHandle,
    pub booth: VotingBooth,
}

impl Node {
    /// Load `config.toml`, install logging and build the ledger.
    pub fn init() -> Result<Self> {
        let config = load_config()?;
        init_tracing(&config.logging.level);
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let ledger = LedgerHandle::with_difficulty(config.ledger.difficulty)?;
        let booth = VotingBooth::new(ledger.clone(), config.election.choices.clone())?
            .with_limits(config.ledger.mining_limits());

        info!(
            difficulty = config.ledger.difficulty,
            choices = config.election.choices.len(),
            "ledger ready"
        );

        Ok(Self { config, ledger, booth })
    }
}
