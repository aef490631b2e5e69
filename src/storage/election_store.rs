//! ElectionStore
//!
//! Persistent store contract for elections, candidates and ballots.
//! Every conditional write is a single atomic operation against the store:
//! - status changes are compare-and-set on the persisted status
//! - candidacy inserts re-check the election phase and the applicant uniqueness index
//! - ballot inserts re-check phase and eligibility and are guarded by the (election, voter) key
//!
//! Rule outcomes are returned as values so that adaptors stay free of error policy; the engine
//! maps them to typed errors.

use std::collections::BTreeMap;

#[cfg(test)]
use mockall::automock;

use crate::time::Timestamp;
use crate::ApprovalStatus;
use crate::CandidacyRequest;
use crate::Candidate;
use crate::CandidateId;
use crate::Election;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::Result;
use crate::ResultSnapshot;
use crate::VoteRecord;
use crate::VoterId;

/// Compare-and-set request on the persisted status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: ElectionStatus,
    pub to: ElectionStatus,
    /// Written in the same atomic step as the status
    pub results: Option<ResultSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSwap {
    Swapped(Election),
    /// Persisted status differed from `from`; nothing was written
    Conflict { current: ElectionStatus },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateInsert {
    Inserted(Candidate),
    PhaseMismatch { status: ElectionStatus },
    /// The applicant already holds a Pending or Approved candidacy
    Duplicate { existing: CandidateId },
    MissingElection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalSwap {
    Decided(Candidate),
    AlreadyDecided { current: ApprovalStatus },
    WindowClosed { status: ElectionStatus },
    MissingCandidate,
    MissingElection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BallotInsert {
    Recorded,
    VotingClosed { status: ElectionStatus },
    CandidateIneligible,
    AlreadyVoted { existing: VoteRecord },
    MissingElection,
}

#[cfg_attr(test, automock)]
pub trait ElectionStore: Send + Sync + 'static {
    /// Fails with `ElectionError::AlreadyExists` when the id is taken.
    fn insert_election(
        &self,
        election: &Election,
    ) -> Result<()>;

    fn election(
        &self,
        election_id: &ElectionId,
    ) -> Result<Option<Election>>;

    fn swap_status(
        &self,
        election_id: &ElectionId,
        transition: &StatusTransition,
    ) -> Result<StatusSwap>;

    /// Allocates the next candidate id and inserts a `Pending` candidate, provided the election
    /// is in `required_status` and the applicant has no live candidacy.
    fn insert_candidate(
        &self,
        election_id: &ElectionId,
        request: &CandidacyRequest,
        required_status: ElectionStatus,
        submitted_at: Timestamp,
    ) -> Result<CandidateInsert>;

    fn candidate(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
    ) -> Result<Option<Candidate>>;

    /// Candidates of one election, ascending by id.
    fn candidates(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<Candidate>>;

    /// Moves a `Pending` candidate to `decision` while the election status is in `window`.
    fn decide_candidate(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
        decision: ApprovalStatus,
        window: &[ElectionStatus],
    ) -> Result<ApprovalSwap>;

    /// Records the ballot and bumps the cached counter of its candidate, provided the election
    /// is `Voting`, the candidate is `Approved`, and the voter has no ballot yet.
    fn insert_ballot(
        &self,
        record: &VoteRecord,
    ) -> Result<BallotInsert>;

    fn ballot(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
    ) -> Result<Option<VoteRecord>>;

    fn ballots(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<VoteRecord>>;

    /// Counters maintained by `insert_ballot`; candidates without votes are absent.
    fn cached_counts(
        &self,
        election_id: &ElectionId,
    ) -> Result<BTreeMap<CandidateId, u64>>;

    fn flush(&self) -> Result<()>;
}
