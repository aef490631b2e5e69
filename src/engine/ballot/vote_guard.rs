//! Vote casting guard.
//!
//! At most one ballot per (election, voter), however many submissions race. The phase check,
//! the eligibility check and the uniqueness check are re-evaluated by the store inside the
//! same atomic insert, never as a separate read followed by a write.

use std::sync::Arc;

use tracing::debug;
use tracing::instrument;

use crate::metrics::BALLOT_REJECTION_METRIC;
use crate::metrics::VOTES_RECORDED_METRIC;
use crate::time::Clock;
use crate::BallotError;
use crate::BallotInsert;
use crate::BallotOrigin;
use crate::CandidateId;
use crate::ElectionError;
use crate::ElectionId;
use crate::ElectionStore;
use crate::Result;
use crate::StoreExecutor;
use crate::VoteReceipt;
use crate::VoteRecord;
use crate::VoterId;

pub struct VoteGuard<S: ElectionStore> {
    executor: StoreExecutor<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ElectionStore> VoteGuard<S> {
    pub fn new(
        executor: StoreExecutor<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { executor, clock }
    }

    /// Casts a direct ballot.
    ///
    /// On `Timeout` the ballot may or may not have been recorded; call [`Self::ballot_for`]
    /// before retrying.
    pub async fn cast_vote(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
        candidate_id: CandidateId,
    ) -> Result<VoteReceipt> {
        self.record(election_id, voter, candidate_id, BallotOrigin::Direct)
            .await
    }

    #[instrument(skip(self, origin), fields(origin = origin.label()))]
    pub(crate) async fn record(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
        candidate_id: CandidateId,
        origin: BallotOrigin,
    ) -> Result<VoteReceipt> {
        voter.validate()?;
        let label = origin.label();
        let record = VoteRecord {
            election_id: election_id.clone(),
            voter: voter.clone(),
            candidate_id,
            cast_at: self.clock.now_millis(),
            origin,
        };
        let receipt = VoteReceipt::from(&record);

        let outcome = self
            .executor
            .run("insert_ballot", move |store| store.insert_ballot(&record))
            .await?;

        let rejection = match outcome {
            BallotInsert::Recorded => {
                VOTES_RECORDED_METRIC.with_label_values(&[label]).inc();
                debug!("ballot recorded");
                return Ok(receipt);
            }
            BallotInsert::VotingClosed { status } => BallotError::VotingNotOpen { status },
            BallotInsert::CandidateIneligible => BallotError::CandidateNotEligible { candidate_id },
            BallotInsert::AlreadyVoted { existing } => {
                debug!(first_choice = %existing.candidate_id, "voter already voted");
                BallotError::AlreadyVoted {
                    election_id: election_id.clone(),
                    voter: voter.clone(),
                }
            }
            BallotInsert::MissingElection => {
                return Err(ElectionError::NotFound(election_id.clone()).into());
            }
        };

        BALLOT_REJECTION_METRIC
            .with_label_values(&[rejection_reason(&rejection)])
            .inc();
        Err(rejection.into())
    }

    /// Re-query entry point: the ballot recorded for `voter`, if any.
    pub async fn ballot_for(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
    ) -> Result<Option<VoteReceipt>> {
        let id = election_id.clone();
        let voter = voter.clone();
        let record = self
            .executor
            .run("ballot", move |store| store.ballot(&id, &voter))
            .await?;
        Ok(record.as_ref().map(VoteReceipt::from))
    }
}

fn rejection_reason(error: &BallotError) -> &'static str {
    match error {
        BallotError::VotingNotOpen { .. } => "voting_not_open",
        BallotError::CandidateNotEligible { .. } => "candidate_not_eligible",
        BallotError::AlreadyVoted { .. } => "already_voted",
    }
}
