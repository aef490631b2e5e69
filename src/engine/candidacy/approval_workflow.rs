use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::engine::lifecycle::authorize;
use crate::metrics::CANDIDACY_DECISION_METRIC;
use crate::time::Clock;
use crate::Actor;
use crate::ApprovalStatus;
use crate::ApprovalSwap;
use crate::CandidacyError;
use crate::CandidacyRequest;
use crate::Candidate;
use crate::CandidateId;
use crate::CandidateInsert;
use crate::ElectionError;
use crate::ElectionEvent;
use crate::ElectionId;
use crate::ElectionStateMachine;
use crate::ElectionStatus;
use crate::ElectionStore;
use crate::EventPublisher;
use crate::Result;
use crate::StoreExecutor;

/// Phases in which a pending candidacy may still be decided.
pub const DECISION_WINDOW: [ElectionStatus; 2] = [ElectionStatus::Registration, ElectionStatus::Voting];

/// Outcome of one entry of a batch decision.
#[derive(Debug)]
pub struct BatchDecisionResult {
    pub candidate_id: CandidateId,
    pub result: Result<Candidate>,
}

pub struct ApprovalWorkflow<S: ElectionStore> {
    executor: StoreExecutor<S>,
    lifecycle: Arc<ElectionStateMachine<S>>,
    events: EventPublisher,
    clock: Arc<dyn Clock>,
}

impl<S: ElectionStore> ApprovalWorkflow<S> {
    pub fn new(
        executor: StoreExecutor<S>,
        lifecycle: Arc<ElectionStateMachine<S>>,
        events: EventPublisher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            executor,
            lifecycle,
            events,
            clock,
        }
    }

    /// Registers a `Pending` candidacy. The phase check and the applicant uniqueness check run
    /// in the same store operation as the insert.
    #[instrument(skip(self, request), fields(applicant = %request.applicant))]
    pub async fn submit_candidacy(
        &self,
        election_id: &ElectionId,
        request: CandidacyRequest,
    ) -> Result<Candidate> {
        request.validate()?;
        let submitted_at = self.clock.now_millis();
        let id = election_id.clone();
        let applicant = request.applicant.clone();

        let outcome = self
            .executor
            .run("insert_candidate", move |store| {
                store.insert_candidate(&id, &request, ElectionStatus::Registration, submitted_at)
            })
            .await?;

        match outcome {
            CandidateInsert::Inserted(candidate) => {
                debug!(candidate_id = %candidate.id, "candidacy submitted");
                Ok(candidate)
            }
            CandidateInsert::PhaseMismatch { status } => Err(CandidacyError::RegistrationClosed { status }.into()),
            CandidateInsert::Duplicate { existing } => {
                Err(CandidacyError::DuplicateCandidate { applicant, existing }.into())
            }
            CandidateInsert::MissingElection => Err(ElectionError::NotFound(election_id.clone()).into()),
        }
    }

    /// Decides a pending candidacy. Decisions are final: a second decision, same or opposite,
    /// fails with `AlreadyDecided`. The election load and the decision write are each bounded by
    /// the operation timeout.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn decide(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
        approve: bool,
        actor: &Actor,
    ) -> Result<Candidate> {
        let election = self.lifecycle.load(election_id).await?;
        authorize(actor, &election, "decide candidacies")?;

        let decision = ApprovalStatus::from_decision(approve);
        let id = election_id.clone();
        let outcome = self
            .executor
            .run("decide_candidate", move |store| {
                store.decide_candidate(&id, candidate_id, decision, &DECISION_WINDOW)
            })
            .await?;

        match outcome {
            ApprovalSwap::Decided(candidate) => {
                CANDIDACY_DECISION_METRIC
                    .with_label_values(&[if approve { "approved" } else { "rejected" }])
                    .inc();
                info!(%candidate_id, %decision, "candidacy decided");
                self.events.publish(ElectionEvent::CandidateDecided {
                    election_id: election_id.clone(),
                    candidate_id,
                    decision,
                });
                Ok(candidate)
            }
            ApprovalSwap::AlreadyDecided { current } => {
                debug!(%candidate_id, %current, "candidacy already decided");
                Err(CandidacyError::AlreadyDecided { candidate_id, current }.into())
            }
            ApprovalSwap::WindowClosed { status } => {
                Err(CandidacyError::DecisionWindowClosed { status }.into())
            }
            ApprovalSwap::MissingCandidate => Err(CandidacyError::NotFound { candidate_id }.into()),
            ApprovalSwap::MissingElection => Err(ElectionError::NotFound(election_id.clone()).into()),
        }
    }

    /// Applies each decision independently, in order. A failed entry does not undo the others.
    pub async fn batch_decide(
        &self,
        election_id: &ElectionId,
        decisions: Vec<(CandidateId, bool)>,
        actor: &Actor,
    ) -> Vec<BatchDecisionResult> {
        let mut results = Vec::with_capacity(decisions.len());
        for (candidate_id, approve) in decisions {
            let result = self.decide(election_id, candidate_id, approve, actor).await;
            if let Err(e) = &result {
                warn!(%candidate_id, "batch entry failed: {}", e);
            }
            results.push(BatchDecisionResult { candidate_id, result });
        }
        results
    }

    pub async fn candidates(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<Candidate>> {
        let id = election_id.clone();
        self.executor.run("candidates", move |store| store.candidates(&id)).await
    }
}
