use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use super::CandidateId;
use super::Election;
use super::ElectionId;
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TallySource {
    /// Counted from the ballot ledger
    Ledger,
    /// Read from the per-candidate counters maintained by the vote guard
    Counters,
    /// Frozen when results were declared
    Snapshot,
}

/// Per-candidate counts over the approved candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyReport {
    pub election_id: ElectionId,
    pub counts: BTreeMap<CandidateId, u64>,
    pub total_votes: u64,
    pub source: TallySource,
}

impl TallyReport {
    pub fn count_for(
        &self,
        candidate_id: CandidateId,
    ) -> u64 {
        self.counts.get(&candidate_id).copied().unwrap_or(0)
    }
}

/// Tally persisted with the election on entry into `ResultDeclared`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub counts: BTreeMap<CandidateId, u64>,
    pub total_votes: u64,
    pub frozen_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerResolution {
    pub election_id: ElectionId,
    pub winner_candidate_id: CandidateId,
    pub vote_count: u64,
    pub total_votes: u64,
    /// More than one candidate shares the maximum; the winner came from the tie-break rule.
    pub is_tie: bool,
    /// Every candidate holding the maximum, ascending by id
    pub tied_candidates: Vec<CandidateId>,
}

/// A counter that disagrees with the ballot ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyDiscrepancy {
    pub candidate_id: CandidateId,
    pub cached: u64,
    pub counted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredResults {
    pub election: Election,
    pub tally: TallyReport,
    pub winner: WinnerResolution,
}
