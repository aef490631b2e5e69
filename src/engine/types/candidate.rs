use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::ElectionId;
use crate::time::Timestamp;
use crate::ElectionError;
use crate::Result;

/// Allocated sequentially per election, starting at 1. Ties are broken by the smallest id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn from_decision(approve: bool) -> Self {
        if approve {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        }
    }

    pub fn is_decided(self) -> bool {
        self != ApprovalStatus::Pending
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub election_id: ElectionId,
    /// Identity (wallet or voter identity) of whoever stands as this candidate
    pub applicant: String,
    pub name: String,
    pub party: String,
    pub manifesto: String,
    pub image_reference: Option<String>,
    pub approval: ApprovalStatus,
    pub submitted_at: Timestamp,
}

impl Candidate {
    pub fn is_approved(&self) -> bool {
        self.approval == ApprovalStatus::Approved
    }
}

/// Typed payload for `submit_candidacy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidacyRequest {
    pub applicant: String,
    pub name: String,
    pub party: String,
    pub manifesto: String,
    pub image_reference: Option<String>,
}

impl CandidacyRequest {
    pub fn validate(&self) -> Result<()> {
        if self.applicant.trim().is_empty() {
            return Err(ElectionError::InvalidRequest("applicant identity cannot be empty".into()).into());
        }
        if self.name.trim().is_empty() {
            return Err(ElectionError::InvalidRequest("candidate name cannot be empty".into()).into());
        }
        Ok(())
    }

    pub(crate) fn into_candidate(
        self,
        id: CandidateId,
        election_id: ElectionId,
        submitted_at: Timestamp,
    ) -> Candidate {
        Candidate {
            id,
            election_id,
            applicant: self.applicant,
            name: self.name,
            party: self.party,
            manifesto: self.manifesto,
            image_reference: self.image_reference,
            approval: ApprovalStatus::Pending,
            submitted_at,
        }
    }
}
