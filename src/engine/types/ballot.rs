use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::CandidateId;
use super::ElectionId;
use crate::time::Timestamp;
use crate::ElectionError;
use crate::Result;

/// Opaque, already-authenticated voter identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoterId(String);

impl VoterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(ElectionError::InvalidRequest("voter identity cannot be empty".into()).into());
        }
        Ok(())
    }
}

impl fmt::Display for VoterId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a ballot entered the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotOrigin {
    Direct,
    /// Confirmed vote-cast event relayed by the ledger adapter
    Ledger { block_height: u64, tx_ref: String },
}

impl BallotOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            BallotOrigin::Direct => "direct",
            BallotOrigin::Ledger { .. } => "ledger",
        }
    }
}

/// Immutable ballot. At most one exists per (election_id, voter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub election_id: ElectionId,
    pub voter: VoterId,
    pub candidate_id: CandidateId,
    pub cast_at: Timestamp,
    pub origin: BallotOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    pub voter: VoterId,
    pub cast_at: Timestamp,
}

impl From<&VoteRecord> for VoteReceipt {
    fn from(record: &VoteRecord) -> Self {
        VoteReceipt {
            election_id: record.election_id.clone(),
            candidate_id: record.candidate_id,
            voter: record.voter.clone(),
            cast_at: record.cast_at,
        }
    }
}
