//! Sled-backed store.
//!
//! Each conditional write is one serializable sled transaction spanning the trees it reads and
//! writes, so concurrent writers on different threads or processes sharing the database see
//! either the full effect of a competing write or none of it.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::ConflictableTransactionError;
use sled::transaction::TransactionError;
use sled::transaction::TransactionalTree;
use sled::Transactional;
use sled::Tree;
use tracing::debug;
use tracing::error;
use tracing::instrument;
use tracing::trace;

use crate::constants::APPLICANTS_TREE;
use crate::constants::BALLOTS_TREE;
use crate::constants::CANDIDATES_TREE;
use crate::constants::CANDIDATE_SEQUENCE_TREE;
use crate::constants::ELECTIONS_TREE;
use crate::constants::FIRST_CANDIDATE_ID;
use crate::constants::VOTE_COUNTERS_TREE;
use crate::convert::election_prefix;
use crate::convert::safe_kv;
use crate::convert::safe_vk;
use crate::convert::scoped_key;
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
use crate::Error;
use crate::Result;
use crate::StatusSwap;
use crate::StatusTransition;
use crate::StorageError;
use crate::VoteRecord;
use crate::VoterId;

type TxResult<T> = std::result::Result<T, ConflictableTransactionError<StorageError>>;

pub struct SledElectionStore {
    db: sled::Db,
    elections: Tree,
    candidates: Tree,
    applicants: Tree,
    sequences: Tree,
    ballots: Tree,
    counters: Tree,
}

impl std::fmt::Debug for SledElectionStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledElectionStore")
            .field("elections", &self.elections.len())
            .field("ballots", &self.ballots.len())
            .finish()
    }
}

impl SledElectionStore {
    pub fn open(db: sled::Db) -> Result<Self> {
        Ok(Self {
            elections: db.open_tree(ELECTIONS_TREE)?,
            candidates: db.open_tree(CANDIDATES_TREE)?,
            applicants: db.open_tree(APPLICANTS_TREE)?,
            sequences: db.open_tree(CANDIDATE_SEQUENCE_TREE)?,
            ballots: db.open_tree(BALLOTS_TREE)?,
            counters: db.open_tree(VOTE_COUNTERS_TREE)?,
            db,
        })
    }

    fn candidate_key(
        election_id: &ElectionId,
        candidate_id: CandidateId,
    ) -> Vec<u8> {
        scoped_key(election_id, &safe_kv(candidate_id.0))
    }

    fn ballot_key(
        election_id: &ElectionId,
        voter: &VoterId,
    ) -> Vec<u8> {
        scoped_key(election_id, voter.as_str().as_bytes())
    }

    fn applicant_key(
        election_id: &ElectionId,
        applicant: &str,
    ) -> Vec<u8> {
        scoped_key(election_id, applicant.as_bytes())
    }

    fn scan<T: DeserializeOwned>(
        tree: &Tree,
        election_id: &ElectionId,
    ) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for item in tree.scan_prefix(election_prefix(election_id)) {
            let (key, value) = item?;
            rows.push(decode(&value, &key).map_err(Error::from)?);
        }
        Ok(rows)
    }
}

fn encode<T: Serialize>(value: &T) -> std::result::Result<Vec<u8>, StorageError> {
    bincode::serialize(value).map_err(|e| StorageError::DataCorruption {
        location: format!("encode: {e}"),
    })
}

fn decode<T: DeserializeOwned>(
    bytes: &[u8],
    key: &[u8],
) -> std::result::Result<T, StorageError> {
    bincode::deserialize(bytes).map_err(|e| {
        error!(?key, "failed to decode stored row: {}", e);
        StorageError::DataCorruption {
            location: format!("{}", String::from_utf8_lossy(key)),
        }
    })
}

fn abort<T>(e: StorageError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(e))
}

fn read_election(
    tx: &TransactionalTree,
    key: &[u8],
) -> TxResult<Option<Election>> {
    match tx.get(key)? {
        Some(bytes) => match decode(&bytes, key) {
            Ok(election) => Ok(Some(election)),
            Err(e) => abort(e),
        },
        None => Ok(None),
    }
}

fn read_candidate(
    tx: &TransactionalTree,
    key: &[u8],
) -> TxResult<Option<Candidate>> {
    match tx.get(key)? {
        Some(bytes) => match decode(&bytes, key) {
            Ok(candidate) => Ok(Some(candidate)),
            Err(e) => abort(e),
        },
        None => Ok(None),
    }
}

fn read_u64(
    tx: &TransactionalTree,
    key: &[u8],
) -> TxResult<Option<u64>> {
    match tx.get(key)? {
        Some(bytes) => match safe_vk(&bytes) {
            Ok(v) => Ok(Some(v)),
            Err(_) => abort(StorageError::DataCorruption {
                location: format!("{}", String::from_utf8_lossy(key)),
            }),
        },
        None => Ok(None),
    }
}

fn finish<T>(result: std::result::Result<T, TransactionError<StorageError>>) -> Result<T> {
    match result {
        Ok(v) => Ok(v),
        Err(TransactionError::Abort(e)) => Err(e.into()),
        Err(TransactionError::Storage(e)) => Err(e.into()),
    }
}

impl ElectionStore for SledElectionStore {
    #[instrument(skip(self, election), fields(election_id = %election.id))]
    fn insert_election(
        &self,
        election: &Election,
    ) -> Result<()> {
        let value = encode(election)?;
        let inserted = self.elections.compare_and_swap(
            election.id.as_str().as_bytes(),
            None as Option<&[u8]>,
            Some(value),
        )?;
        if inserted.is_err() {
            return Err(ElectionError::AlreadyExists(election.id.clone()).into());
        }
        self.sequences
            .insert(election.id.as_str().as_bytes(), &safe_kv(FIRST_CANDIDATE_ID)[..])?;
        debug!("election inserted");
        Ok(())
    }

    fn election(
        &self,
        election_id: &ElectionId,
    ) -> Result<Option<Election>> {
        let key = election_id.as_str().as_bytes();
        match self.elections.get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes, key)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, transition), fields(from = %transition.from, to = %transition.to))]
    fn swap_status(
        &self,
        election_id: &ElectionId,
        transition: &StatusTransition,
    ) -> Result<StatusSwap> {
        let key = election_id.as_str().as_bytes();
        finish(self.elections.transaction(|tx| {
            let Some(mut election) = read_election(tx, key)? else {
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
            let value = match encode(&election) {
                Ok(v) => v,
                Err(e) => return abort(e),
            };
            tx.insert(key, value)?;
            Ok(StatusSwap::Swapped(election))
        }))
    }

    #[instrument(skip(self, request), fields(applicant = %request.applicant))]
    fn insert_candidate(
        &self,
        election_id: &ElectionId,
        request: &CandidacyRequest,
        required_status: ElectionStatus,
        submitted_at: Timestamp,
    ) -> Result<CandidateInsert> {
        let election_key = election_id.as_str().as_bytes();
        let applicant_key = Self::applicant_key(election_id, &request.applicant);

        finish(
            (&self.elections, &self.candidates, &self.applicants, &self.sequences).transaction(
                |(elections, candidates, applicants, sequences)| {
                    let Some(election) = read_election(elections, election_key)? else {
                        return Ok(CandidateInsert::MissingElection);
                    };
                    if election.status != required_status {
                        return Ok(CandidateInsert::PhaseMismatch {
                            status: election.status,
                        });
                    }

                    if let Some(existing) = read_u64(applicants, &applicant_key)? {
                        let existing = CandidateId(existing);
                        let live = read_candidate(
                            candidates,
                            &Self::candidate_key(election_id, existing),
                        )?
                        .map(|c| c.approval != ApprovalStatus::Rejected)
                        .unwrap_or(false);
                        if live {
                            return Ok(CandidateInsert::Duplicate { existing });
                        }
                    }

                    let next = read_u64(sequences, election_key)?.unwrap_or(FIRST_CANDIDATE_ID);
                    let id = CandidateId(next);
                    let candidate =
                        request
                            .clone()
                            .into_candidate(id, election_id.clone(), submitted_at);
                    let value = match encode(&candidate) {
                        Ok(v) => v,
                        Err(e) => return abort(e),
                    };

                    candidates.insert(Self::candidate_key(election_id, id), value)?;
                    applicants.insert(applicant_key.clone(), safe_kv(id.0).to_vec())?;
                    sequences.insert(election_key, safe_kv(next + 1).to_vec())?;
                    Ok(CandidateInsert::Inserted(candidate))
                },
            ),
        )
    }

    fn candidate(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
    ) -> Result<Option<Candidate>> {
        let key = Self::candidate_key(election_id, candidate_id);
        match self.candidates.get(&key)? {
            Some(bytes) => Ok(Some(decode(&bytes, &key)?)),
            None => Ok(None),
        }
    }

    fn candidates(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<Candidate>> {
        // Big-endian id suffix keeps the scan ascending by candidate id
        Self::scan(&self.candidates, election_id)
    }

    #[instrument(skip(self, window))]
    fn decide_candidate(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
        decision: ApprovalStatus,
        window: &[ElectionStatus],
    ) -> Result<ApprovalSwap> {
        let election_key = election_id.as_str().as_bytes();
        let candidate_key = Self::candidate_key(election_id, candidate_id);

        finish((&self.elections, &self.candidates).transaction(|(elections, candidates)| {
            let Some(election) = read_election(elections, election_key)? else {
                return Ok(ApprovalSwap::MissingElection);
            };
            let Some(mut candidate) = read_candidate(candidates, &candidate_key)? else {
                return Ok(ApprovalSwap::MissingCandidate);
            };
            if candidate.approval.is_decided() {
                return Ok(ApprovalSwap::AlreadyDecided {
                    current: candidate.approval,
                });
            }
            if !window.contains(&election.status) {
                return Ok(ApprovalSwap::WindowClosed {
                    status: election.status,
                });
            }
            candidate.approval = decision;
            let value = match encode(&candidate) {
                Ok(v) => v,
                Err(e) => return abort(e),
            };
            candidates.insert(candidate_key.clone(), value)?;
            Ok(ApprovalSwap::Decided(candidate))
        }))
    }

    #[instrument(skip(self, record), fields(election_id = %record.election_id, candidate_id = %record.candidate_id))]
    fn insert_ballot(
        &self,
        record: &VoteRecord,
    ) -> Result<BallotInsert> {
        let election_key = record.election_id.as_str().as_bytes();
        let candidate_key = Self::candidate_key(&record.election_id, record.candidate_id);
        let ballot_key = Self::ballot_key(&record.election_id, &record.voter);
        let value = encode(record)?;

        let outcome = finish(
            (&self.elections, &self.candidates, &self.ballots, &self.counters).transaction(
                |(elections, candidates, ballots, counters)| {
                    let Some(election) = read_election(elections, election_key)? else {
                        return Ok(BallotInsert::MissingElection);
                    };
                    if election.status != ElectionStatus::Voting {
                        return Ok(BallotInsert::VotingClosed {
                            status: election.status,
                        });
                    }
                    let eligible = read_candidate(candidates, &candidate_key)?
                        .map(|c| c.is_approved())
                        .unwrap_or(false);
                    if !eligible {
                        return Ok(BallotInsert::CandidateIneligible);
                    }
                    if let Some(bytes) = ballots.get(&ballot_key)? {
                        return match decode(&bytes, &ballot_key) {
                            Ok(existing) => Ok(BallotInsert::AlreadyVoted { existing }),
                            Err(e) => abort(e),
                        };
                    }

                    ballots.insert(ballot_key.clone(), value.clone())?;
                    // Counter rows share the candidate key layout
                    let count = read_u64(counters, &candidate_key)?.unwrap_or(0);
                    counters.insert(candidate_key.clone(), safe_kv(count + 1).to_vec())?;
                    Ok(BallotInsert::Recorded)
                },
            ),
        )?;

        trace!(?outcome, "insert_ballot finished");
        Ok(outcome)
    }

    fn ballot(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
    ) -> Result<Option<VoteRecord>> {
        let key = Self::ballot_key(election_id, voter);
        match self.ballots.get(&key)? {
            Some(bytes) => Ok(Some(decode(&bytes, &key)?)),
            None => Ok(None),
        }
    }

    fn ballots(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<VoteRecord>> {
        Self::scan(&self.ballots, election_id)
    }

    fn cached_counts(
        &self,
        election_id: &ElectionId,
    ) -> Result<BTreeMap<CandidateId, u64>> {
        let prefix = election_prefix(election_id);
        let mut counts = BTreeMap::new();
        for item in self.counters.scan_prefix(&prefix) {
            let (key, value) = item?;
            let candidate_id = safe_vk(&key[prefix.len()..])?;
            counts.insert(CandidateId(candidate_id), safe_vk(&value)?);
        }
        Ok(counts)
    }

    fn flush(&self) -> Result<()> {
        let bytes = self.db.flush()?;
        trace!("flushed {} bytes", bytes);
        Ok(())
    }
}
