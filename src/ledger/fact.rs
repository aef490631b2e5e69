use serde::Deserialize;
use serde::Serialize;

use crate::CandidacyRequest;
use crate::CandidateId;
use crate::ElectionId;
use crate::VoterId;

/// A confirmed event observed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerFact {
    VoteCast {
        election_id: ElectionId,
        voter: VoterId,
        candidate_id: CandidateId,
        block_height: u64,
        tx_ref: String,
    },
    CandidateRegistered {
        election_id: ElectionId,
        request: CandidacyRequest,
        block_height: u64,
    },
}

impl LedgerFact {
    pub fn election_id(&self) -> &ElectionId {
        match self {
            LedgerFact::VoteCast { election_id, .. }
            | LedgerFact::CandidateRegistered { election_id, .. } => election_id,
        }
    }

    pub fn block_height(&self) -> u64 {
        match self {
            LedgerFact::VoteCast { block_height, .. }
            | LedgerFact::CandidateRegistered { block_height, .. } => *block_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The fact changed engine state
    Applied,
    /// The same fact was already applied
    Duplicate,
    /// The voter already holds a ballot for a different candidate
    Conflict { existing: CandidateId },
    /// The fact breaks an election rule and was dropped
    Rejected { reason: String },
}

/// Per-outcome counters returned when the ingest loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: u64,
    pub duplicates: u64,
    pub conflicts: u64,
    pub rejected: u64,
    pub failed: u64,
}

impl IngestStats {
    pub(crate) fn observe(
        &mut self,
        outcome: &IngestOutcome,
    ) {
        match outcome {
            IngestOutcome::Applied => self.applied += 1,
            IngestOutcome::Duplicate => self.duplicates += 1,
            IngestOutcome::Conflict { .. } => self.conflicts += 1,
            IngestOutcome::Rejected { .. } => self.rejected += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.applied + self.duplicates + self.conflicts + self.rejected + self.failed
    }
}
