//! Entry point for callers of the election engine.
//!
//! Every operation names its election explicitly; the engine holds no notion of a current
//! election. Rule violations come back as `ElectionError`s, store trouble as `SystemError`s,
//! see [`crate::Error::kind`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use tracing::instrument;

use crate::derive_phase_from_clock;
use crate::time::Clock;
use crate::Actor;
use crate::ApprovalWorkflow;
use crate::BallotOrigin;
use crate::BatchDecisionResult;
use crate::CandidacyRequest;
use crate::Candidate;
use crate::CandidateId;
use crate::CreateElectionRequest;
use crate::DeclaredResults;
use crate::Election;
use crate::ElectionError;
use crate::ElectionEvent;
use crate::ElectionId;
use crate::ElectionStateMachine;
use crate::ElectionStatus;
use crate::ElectionStore;
use crate::EngineConfig;
use crate::EventPublisher;
use crate::Result;
use crate::StoreExecutor;
use crate::TallyDiscrepancy;
use crate::TallyHandler;
use crate::TallyReport;
use crate::VoteGuard;
use crate::VoteReceipt;
use crate::VoterId;
use crate::WinnerResolution;

pub struct ElectionEngine<S: ElectionStore> {
    executor: StoreExecutor<S>,
    lifecycle: Arc<ElectionStateMachine<S>>,
    workflow: ApprovalWorkflow<S>,
    guard: VoteGuard<S>,
    tally: TallyHandler<S>,
    events: EventPublisher,
    clock: Arc<dyn Clock>,
}

impl<S: ElectionStore> ElectionEngine<S> {
    pub fn new(
        store: Arc<S>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let executor = StoreExecutor::new(store, config.operation_timeout());
        let events = EventPublisher::new(config.event_channel_capacity);
        let lifecycle = Arc::new(ElectionStateMachine::new(executor.clone(), events.clone()));

        Self {
            workflow: ApprovalWorkflow::new(
                executor.clone(),
                lifecycle.clone(),
                events.clone(),
                clock.clone(),
            ),
            guard: VoteGuard::new(executor.clone(), clock.clone()),
            tally: TallyHandler::new(executor.clone(), lifecycle.clone(), events.clone(), clock.clone()),
            executor,
            lifecycle,
            events,
            clock,
        }
    }

    /// Creates an election in `Created`, owned by `actor`. A missing id is generated.
    #[instrument(skip(self, request, actor), fields(actor = %actor))]
    pub async fn create_election(
        &self,
        mut request: CreateElectionRequest,
        actor: &Actor,
    ) -> Result<Election> {
        let id = request.id.get_or_insert_with(ElectionId::generate).clone();
        if !actor.can_create_elections() {
            return Err(ElectionError::Unauthorized {
                actor: actor.to_string(),
                action: "create elections",
                election_id: id,
            }
            .into());
        }
        request.validate()?;

        let election = request.into_election(actor.identity.clone(), self.clock.now_millis());
        let row = election.clone();
        self.executor
            .run("insert_election", move |store| store.insert_election(&row))
            .await?;

        info!(election_id = %election.id, "election created");
        Ok(election)
    }

    pub async fn election(
        &self,
        election_id: &ElectionId,
    ) -> Result<Election> {
        self.lifecycle.load(election_id).await
    }

    pub async fn candidates(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<Candidate>> {
        self.workflow.candidates(election_id).await
    }

    /// Moves the election one phase forward. Entering `ResultDeclared` freezes the tally, as
    /// [`Self::declare_results`] does.
    pub async fn advance(
        &self,
        election_id: &ElectionId,
        target: ElectionStatus,
        actor: &Actor,
    ) -> Result<Election> {
        if target == ElectionStatus::ResultDeclared {
            return self
                .tally
                .declare_results(election_id, actor)
                .await
                .map(|declared| declared.election);
        }
        self.lifecycle.advance(election_id, target, actor).await
    }

    /// Clock-based phase estimate for display. Never used to authorize anything.
    pub async fn derive_phase(
        &self,
        election_id: &ElectionId,
    ) -> Result<ElectionStatus> {
        let election = self.lifecycle.load(election_id).await?;
        Ok(derive_phase_from_clock(&election, self.clock.now_millis()))
    }

    pub async fn submit_candidacy(
        &self,
        election_id: &ElectionId,
        request: CandidacyRequest,
    ) -> Result<Candidate> {
        self.workflow.submit_candidacy(election_id, request).await
    }

    pub async fn decide(
        &self,
        election_id: &ElectionId,
        candidate_id: CandidateId,
        approve: bool,
        actor: &Actor,
    ) -> Result<Candidate> {
        self.workflow.decide(election_id, candidate_id, approve, actor).await
    }

    pub async fn batch_decide(
        &self,
        election_id: &ElectionId,
        decisions: Vec<(CandidateId, bool)>,
        actor: &Actor,
    ) -> Vec<BatchDecisionResult> {
        self.workflow.batch_decide(election_id, decisions, actor).await
    }

    pub async fn cast_vote(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
        candidate_id: CandidateId,
    ) -> Result<VoteReceipt> {
        self.guard.cast_vote(election_id, voter, candidate_id).await
    }

    pub(crate) async fn record_ballot(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
        candidate_id: CandidateId,
        origin: BallotOrigin,
    ) -> Result<VoteReceipt> {
        self.guard.record(election_id, voter, candidate_id, origin).await
    }

    pub async fn ballot_for(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
    ) -> Result<Option<VoteReceipt>> {
        self.guard.ballot_for(election_id, voter).await
    }

    pub async fn tally(
        &self,
        election_id: &ElectionId,
    ) -> Result<TallyReport> {
        self.tally.tally(election_id).await
    }

    pub async fn cached_tally(
        &self,
        election_id: &ElectionId,
    ) -> Result<TallyReport> {
        self.tally.cached_tally(election_id).await
    }

    pub async fn audit_tally(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<TallyDiscrepancy>> {
        self.tally.audit_tally(election_id).await
    }

    pub async fn resolve_winner(
        &self,
        election_id: &ElectionId,
    ) -> Result<WinnerResolution> {
        self.tally.resolve_winner(election_id).await
    }

    pub async fn declare_results(
        &self,
        election_id: &ElectionId,
        actor: &Actor,
    ) -> Result<DeclaredResults> {
        self.tally.declare_results(election_id, actor).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ElectionEvent> {
        self.events.subscribe()
    }

    pub async fn flush(&self) -> Result<()> {
        self.executor.run("flush", |store| store.flush()).await
    }
}
