use crate::blockchain::core::chain::{Block, VotePayload, GENESIS_PREVIOUS_HASH};
use crate::error::ChainError;

/// Reject payloads with a blank voter id or choice.
pub fn validate_payload(payload: &VotePayload) -> Result<(), ChainError> {
    if payload.voter_id.trim().is_empty() {
        return Err(ChainError::InvalidVote("voter id must not be empty".to_string()));
    }
    if payload.choice.trim().is_empty() {
        return Err(ChainError::InvalidVote("choice must not be empty".to_string()));
    }
    Ok(())
}

/// Walk the chain from the first block after genesis. The first block must
/// be stored as index 0 linking to `"0"`. After it, each block's stored hash
/// must match its recomputed content hash, its index must be one past its
/// predecessor's, and its `previous_hash` must equal the hash of the block
/// before it. The genesis hash itself is the trusted root and is not checked.
///
/// Errors carry the position of the first failing block.
pub fn validate_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks.first().ok_or(ChainError::EmptyChain)?;
    if genesis.index() != 0 || genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
        tracing::warn!(index = genesis.index(), "chain does not start at genesis");
        return Err(ChainError::InvalidGenesis);
    }

    for (offset, pair) in blocks.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let index = offset as u64 + 1;

        if !current.has_valid_hash() {
            tracing::warn!(index, stored = %current.hash(), "block hash mismatch");
            return Err(ChainError::TamperedBlock { index });
        }

        if previous.index().checked_add(1) != Some(current.index()) {
            tracing::warn!(index, stored = current.index(), "block index out of sequence");
            return Err(ChainError::InvalidBlockLinkage { index });
        }

        if current.previous_hash() != previous.hash() {
            tracing::warn!(index, "block does not link to its predecessor");
            return Err(ChainError::InvalidBlockLinkage { index });
        }
    }
    Ok(())
}
