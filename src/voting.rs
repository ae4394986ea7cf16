//! Vote casting on top of the ledger.
//!
//! The ledger records whatever it is given. The booth is the collaborator that
//! decides what may be recorded: a known choice, and at most one vote per
//! voter. Authentication stays with the caller; the booth trusts the voter id
//! it receives.

use crate::blockchain::{Block, Tally, VotePayload};
use crate::error::{ChainError, Result};
use crate::miner::MiningLimits;
use crate::node::LedgerHandle;
use serde::Serialize;
use tracing::{info, warn};

/// Votes for one choice, as shown on a results dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceResult {
    pub choice: String,
    pub votes: u64,
    /// Percentage of all recorded votes.
    pub share: f64,
}

#[derive(Debug, Clone)]
pub struct VotingBooth {
    ledger: LedgerHandle,
    choices: Vec<String>,
    limits: MiningLimits,
}

impl VotingBooth {
    pub fn new(ledger: LedgerHandle, choices: Vec<String>) -> Result<Self> {
        if choices.is_empty() {
            return Err(ChainError::InvalidConfig("a ballot needs at least one choice".to_string()));
        }
        Ok(Self {
            ledger,
            choices,
            limits: MiningLimits::default(),
        })
    }

    /// Bound mining time for every vote cast through this booth.
    pub fn with_limits(mut self, limits: MiningLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.ledger.has_voted(voter_id)
    }

    /// Record one vote. The duplicate check and the append run under the same
    /// write lock, so two concurrent votes by one voter cannot both land.
    pub fn cast_vote(&self, voter_id: &str, choice: &str) -> Result<Block> {
        let voter_id = voter_id.trim();
        let choice = choice.trim();

        if voter_id.is_empty() {
            return Err(ChainError::InvalidVote("voter id must not be empty".to_string()));
        }
        if !self.choices.iter().any(|c| c == choice) {
            warn!(voter_id, choice, "rejected vote for unknown choice");
            return Err(ChainError::UnknownChoice(choice.to_string()));
        }

        let block = self.ledger.with_write(|chain| {
            if chain.has_voted(voter_id) {
                warn!(voter_id, "rejected duplicate vote");
                return Err(ChainError::AlreadyVoted(voter_id.to_string()));
            }
            chain.append_with(VotePayload::new(voter_id, choice), &self.limits)
        })?;

        info!(voter_id, index = block.index(), "vote recorded");
        Ok(block)
    }

    /// [`VotingBooth::cast_vote`] on the blocking thread pool.
    pub async fn cast_vote_async(&self, voter_id: String, choice: String) -> Result<Block> {
        let booth = self.clone();
        tokio::task::spawn_blocking(move || booth.cast_vote(&voter_id, &choice))
            .await
            .map_err(|e| ChainError::Internal(format!("voting task failed: {}", e)))?
    }

    pub fn results(&self) -> Tally {
        self.ledger.results()
    }

    pub fn results_by_choice(&self) -> Vec<ChoiceResult> {
        self.rows_for(&self.results())
    }

    /// Every configured choice in ballot order, zero when unvoted, followed
    /// by any other choice found in `tally`.
    pub fn rows_for(&self, tally: &Tally) -> Vec<ChoiceResult> {
        let entry = |choice: &str| ChoiceResult {
            choice: choice.to_string(),
            votes: tally.get(choice),
            share: tally.share(choice),
        };

        let mut rows: Vec<ChoiceResult> = self.choices.iter().map(|c| entry(c)).collect();
        rows.extend(
            tally
                .iter()
                .filter(|(choice, _)| !self.choices.iter().any(|c| c == choice))
                .map(|(choice, _)| entry(choice)),
        );
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::CancelToken;

    fn booth() -> VotingBooth {
        let ledger = LedgerHandle::with_difficulty(1).unwrap();
        VotingBooth::new(ledger, vec!["Yes".to_string(), "No".to_string()]).unwrap()
    }

    #[test]
    fn test_cast_vote_records_block() {
        let booth = booth();
        let block = booth.cast_vote("alice", "Yes").unwrap();

        assert_eq!(block.index(), 1);
        assert_eq!(block.payload().voter_id, "alice");
        assert!(booth.has_voted("alice"));
        assert!(booth.ledger().is_valid());
    }

    #[test]
    fn test_second_vote_is_rejected() {
        let booth = booth();
        booth.cast_vote("alice", "Yes").unwrap();

        let err = booth.cast_vote("alice", "No").unwrap_err();
        assert_eq!(err, ChainError::AlreadyVoted("alice".to_string()));
        assert_eq!(booth.ledger().block_count(), 2);
    }

    #[test]
    fn test_unknown_and_blank_input() {
        let booth = booth();
        assert_eq!(
            booth.cast_vote("alice", "Maybe").unwrap_err(),
            ChainError::UnknownChoice("Maybe".to_string())
        );
        assert!(matches!(booth.cast_vote("  ", "Yes"), Err(ChainError::InvalidVote(_))));
        assert_eq!(booth.ledger().block_count(), 1);
    }

    #[test]
    fn test_empty_ballot_is_rejected() {
        let ledger = LedgerHandle::with_difficulty(0).unwrap();
        assert!(VotingBooth::new(ledger, vec![]).is_err());
    }

    #[test]
    fn test_results_follow_ballot_order() {
        let booth = booth();
        booth.cast_vote("a", "No").unwrap();
        booth.cast_vote("b", "No").unwrap();
        // recorded directly on the ledger, outside the ballot
        booth.ledger().append(VotePayload::new("c", "Write-in")).unwrap();

        let rows = booth.results_by_choice();
        let names: Vec<_> = rows.iter().map(|r| r.choice.as_str()).collect();
        assert_eq!(names, vec!["Yes", "No", "Write-in"]);
        assert_eq!(rows[0].votes, 0);
        assert_eq!(rows[1].votes, 2);
        assert_eq!(rows[2].votes, 1);
    }

    #[test]
    fn test_rows_follow_the_given_snapshot() {
        let booth = booth();
        let snapshot = booth.results();
        booth.cast_vote("alice", "Yes").unwrap();

        let rows = booth.rows_for(&snapshot);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.votes == 0));
        assert_eq!(booth.results_by_choice()[0].votes, 1);
    }

    #[test]
    fn test_cancelled_mining_records_nothing() {
        let token = CancelToken::new();
        token.cancel();
        let ledger = LedgerHandle::with_difficulty(12).unwrap();
        let booth = VotingBooth::new(ledger, vec!["Yes".to_string()])
            .unwrap()
            .with_limits(MiningLimits::default().with_cancel(token));

        assert_eq!(booth.cast_vote("alice", "Yes").unwrap_err(), ChainError::MiningCancelled);
        assert!(!booth.has_voted("alice"));
    }

    #[tokio::test]
    async fn test_cast_vote_async() {
        let booth = booth();
        let block = booth
            .cast_vote_async("alice".to_string(), "Yes".to_string())
            .await
            .unwrap();
        assert_eq!(block.index(), 1);
        assert!(booth.has_voted("alice"));
    }
}
