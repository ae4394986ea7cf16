use super::chain::Block;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vote counts per choice, ordered by choice name.
///
/// Always an owned snapshot: later appends to the ledger do not change a
/// `Tally` that was already handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tally {
    counts: BTreeMap<String, u64>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the choice of every block after the first. The genesis block is
    /// skipped by position, so a forged `index` cannot hide a vote.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut tally = Tally::new();
        for block in blocks.iter().skip(1) {
            tally.record(&block.payload().choice);
        }
        tally
    }

    pub fn record(&mut self, choice: &str) {
        *self.counts.entry(choice.to_string()).or_insert(0) += 1;
    }

    /// Votes for `choice`, zero if it never received any.
    pub fn get(&self, choice: &str) -> u64 {
        self.counts.get(choice).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct choices that received votes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Choice with the most votes. Ties go to the alphabetically first choice.
    pub fn leader(&self) -> Option<(&str, u64)> {
        let mut best: Option<(&str, u64)> = None;
        for (choice, &count) in &self.counts {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((choice.as_str(), count));
            }
        }
        best
    }

    /// Percentage of all votes cast for `choice`, 0.0 when nothing was cast.
    pub fn share(&self, choice: &str) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.get(choice) as f64 * 100.0 / total as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(choice, &count)| (choice.as_str(), count))
    }

    pub fn into_inner(self) -> BTreeMap<String, u64> {
        self.counts
    }
}

impl FromIterator<(String, u64)> for Tally {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Tally {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Explorer statistics for the whole chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub total_blocks: usize,
    pub total_votes: usize,
    pub difficulty: u32,
    pub latest_hash: String,
    pub is_valid: bool,
}
