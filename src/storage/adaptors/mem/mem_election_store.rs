//! In-memory store. Every conditional write runs under one write lock, which makes it the
//! atomic section the store contract asks for.

use std::collections::BTreeMap;
use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use crate::constants::FIRST_CANDIDATE_ID;
use crate::time::Timestamp;
use crate::ApprovalStatus;
use crate::ApprovalSwap;
use crate::BallotInsert;
use crate::CandidacyRequest;
use crate::Candidate;
use crate::CandidateId;
use crate::CandidateInsert;
use crate::Election;
use crate::ElectionError;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::ElectionStore;
use crate::Result;
use crate::StatusSwap;
use crate::StatusTransition;
use crate::VoteRecord;
use crate::VoterId;

#[derive(Debug, Default)]
struct ElectionRows {
    election: Option<Election>,
    candidates: BTreeMap<CandidateId, Candidate>,
    applicants: HashMap<String, CandidateId>,
    next_candidate_id: u64,
    ballots: HashMap<VoterId, VoteRecord>,
    counters: BTreeMap<CandidateId, u64>,
}

#[derive(Debug, Default)]
pub struct MemoryElectionStore {
    rows: RwLock<HashMap<ElectionId, ElectionRows>>,
}

impl MemoryElectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ElectionStore for MemoryElectionStore {
    fn insert_election(
        &self,
        election: &Election,
    ) -> Result<()> {
        let mut guard = self.rows.write();
        let entry = guard.entry(election.id.clone()).or_default();
        if entry.election.is_some() {
            return Err(ElectionError::AlreadyExists(election.id.clone()).into());
        }
        entry.election = Some(election.clone());
        entry.next_candidate_id = FIRST_CANDIDATE_ID;
        debug!(election_id = %election.id, "election inserted");
        Ok(())
    }

    fn election(
        &self,
        election_id: &ElectionId,
    ) -> Result<Option<Election>> {
        Ok(self.rows.read().get(election_id).and_then(|r| r.election.clone()))
    }

    fn swap_status(
        &self,
        election_id: &ElectionId,
        transition: &StatusTransition,
    ) -> Result<StatusSwap> {
        let mut guard = self.rows.write();
        let Some(election) = guard.get_mut(election_id).and_then(|r| r.election.as_mut()) else {
            return Ok(StatusSwap::Missing);
        };
        if election.status != transition.from {
            return Ok(StatusSwap::Conflict {
                current: election.status,
            });
        }
        election.status = transition.to;
        if transition.results.is_some() {
            election.results = transition.results.clone();
        }
        Ok(StatusSwap::Swapped(election.clone()))
    }

    fn insert_candidate(
        &self,
        election_id: &ElectionId,
        request: &CandidacyRequest,
        required_status: ElectionStatus,
        submitted_at: Timestamp,
    ) -> Result<CandidateInsert> {
        let mut guard = self.rows.write();
        let Some(rows) = guard.get_mut(election_id) else {
            return Ok(CandidateInsert::MissingElection);
        };
        let Some(election) = rows.election.as_ref() else {
            return Ok(CandidateInsert::MissingElection);
        };
        if election.status != required_status {
            return Ok(CandidateInsert::PhaseMismatch {
                status: election.status,
            });
        }

        if let Some(existing) = rows.applicants.get(&request.applicant) {
            let live = rows
                .candidates
                .get(existing)
                .map(|c| c.approval != ApprovalStatus::Rejected)
                .unwrap_or(false);
            if live {
                return Ok(CandidateInsert::Duplicate { existing: *existing });
            }
        }

        let id = CandidateId(rows.next_candidate_id);
        rows.next_candidate_id += 1;
        let candidate = request.clone().into_candidate(id, election_id.clone(), submitted_at);
        rows.applicants.insert(request.applicant.clone(), id);
        rows.candidates.insert(id, candidate.clone());
        trace!(%election_id, candidate_id = %id, "candidate inserted");
        Ok(CandidateInsert::Inserted(candidate))
    }

    fn candidate(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
    ) -> Result<Option<Candidate>> {
        Ok(self
            .rows
            .read()
            .get(election_id)
            .and_then(|r| r.candidates.get(&candidate_id).cloned()))
    }

    fn candidates(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<Candidate>> {
        Ok(self
            .rows
            .read()
            .get(election_id)
            .map(|r| r.candidates.values().cloned().collect())
            .unwrap_or_default())
    }

    fn decide_candidate(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
        decision: ApprovalStatus,
        window: &[ElectionStatus],
    ) -> Result<ApprovalSwap> {
        let mut guard = self.rows.write();
        let Some(rows) = guard.get_mut(election_id) else {
            return Ok(ApprovalSwap::MissingElection);
        };
        let Some(status) = rows.election.as_ref().map(|e| e.status) else {
            return Ok(ApprovalSwap::MissingElection);
        };
        let Some(candidate) = rows.candidates.get_mut(&candidate_id) else {
            return Ok(ApprovalSwap::MissingCandidate);
        };
        if candidate.approval.is_decided() {
            return Ok(ApprovalSwap::AlreadyDecided {
                current: candidate.approval,
            });
        }
        if !window.contains(&status) {
            return Ok(ApprovalSwap::WindowClosed { status });
        }
        candidate.approval = decision;
        Ok(ApprovalSwap::Decided(candidate.clone()))
    }

    fn insert_ballot(
        &self,
        record: &VoteRecord,
    ) -> Result<BallotInsert> {
        let mut guard = self.rows.write();
        let Some(rows) = guard.get_mut(&record.election_id) else {
            return Ok(BallotInsert::MissingElection);
        };
        let Some(status) = rows.election.as_ref().map(|e| e.status) else {
            return Ok(BallotInsert::MissingElection);
        };
        if status != ElectionStatus::Voting {
            return Ok(BallotInsert::VotingClosed { status });
        }
        let eligible = rows
            .candidates
            .get(&record.candidate_id)
            .map(Candidate::is_approved)
            .unwrap_or(false);
        if !eligible {
            return Ok(BallotInsert::CandidateIneligible);
        }
        if let Some(existing) = rows.ballots.get(&record.voter) {
            return Ok(BallotInsert::AlreadyVoted {
                existing: existing.clone(),
            });
        }

        rows.ballots.insert(record.voter.clone(), record.clone());
        *rows.counters.entry(record.candidate_id).or_insert(0) += 1;
        Ok(BallotInsert::Recorded)
    }

    fn ballot(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
    ) -> Result<Option<VoteRecord>> {
        Ok(self
            .rows
            .read()
            .get(election_id)
            .and_then(|r| r.ballots.get(voter).cloned()))
    }

    fn ballots(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<VoteRecord>> {
        Ok(self
            .rows
            .read()
            .get(election_id)
            .map(|r| r.ballots.values().cloned().collect())
            .unwrap_or_default())
    }

    fn cached_counts(
        &self,
        election_id: &ElectionId,
    ) -> Result<BTreeMap<CandidateId, u64>> {
        Ok(self
            .rows
            .read()
            .get(election_id)
            .map(|r| r.counters.clone())
            .unwrap_or_default())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
