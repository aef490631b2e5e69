use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::authorize;
use crate::metrics::PHASE_TRANSITION_METRIC;
use crate::Actor;
use crate::Candidate;
use crate::Election;
use crate::ElectionError;
use crate::ElectionEvent;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::ElectionStore;
use crate::EventPublisher;
use crate::LifecycleError;
use crate::Result;
use crate::ResultSnapshot;
use crate::StatusSwap;
use crate::StatusTransition;
use crate::StoreExecutor;
use crate::SystemError;

/// Owns every status change of every election.
///
/// Transitions of one election are serialized twice: by an in-process lock held for the whole
/// read-check-write sequence, and by the store's compare-and-set on the persisted status, which
/// also covers writers in other processes.
pub struct ElectionStateMachine<S: ElectionStore> {
    executor: StoreExecutor<S>,
    events: EventPublisher,
    locks: DashMap<ElectionId, Arc<Mutex<()>>>,
}

impl<S: ElectionStore> ElectionStateMachine<S> {
    pub fn new(
        executor: StoreExecutor<S>,
        events: EventPublisher,
    ) -> Self {
        Self {
            executor,
            events,
            locks: DashMap::new(),
        }
    }

    /// Moves the election to `target`, the immediate successor of its persisted status.
    ///
    /// `ResultDeclared` is only entered together with a frozen tally; use `declare_results`.
    /// Each step (lock wait, load, guard read, status swap) is bounded by the operation timeout
    /// on its own.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn advance(
        &self,
        election_id: &ElectionId,
        target: ElectionStatus,
        actor: &Actor,
    ) -> Result<Election> {
        let _guard = self.lock(election_id).await?;
        let election = self.load(election_id).await?;
        self.check_transition(&election, target, actor, false).await?;
        self.commit(&election, target, None, actor).await
    }

    pub(crate) async fn load(
        &self,
        election_id: &ElectionId,
    ) -> Result<Election> {
        let id = election_id.clone();
        self.executor
            .run("election", move |store| store.election(&id))
            .await?
            .ok_or_else(|| ElectionError::NotFound(election_id.clone()).into())
    }

    /// Acquires the per-election transition lock, bounded by the operation timeout.
    pub(crate) async fn lock(
        &self,
        election_id: &ElectionId,
    ) -> Result<OwnedMutexGuard<()>> {
        let mutex = self.locks.entry(election_id.clone()).or_default().clone();
        let timeout = self.executor.timeout();

        tokio::time::timeout(timeout, mutex.lock_owned()).await.map_err(|_| {
            warn!(%election_id, "transition lock not acquired within {:?}", timeout);
            SystemError::Timeout {
                operation: "transition_lock",
                duration: timeout,
            }
            .into()
        })
    }

    /// Authorization first, then successor legality, then the guards of the target phase.
    pub(crate) async fn check_transition(
        &self,
        election: &Election,
        target: ElectionStatus,
        actor: &Actor,
        results_frozen: bool,
    ) -> Result<()> {
        authorize(actor, election, "advance")?;

        if election.status.successor() != Some(target) {
            debug!(from = %election.status, to = %target, "rejecting transition");
            return Err(LifecycleError::InvalidTransition {
                from: election.status,
                to: target,
            }
            .into());
        }

        match target {
            ElectionStatus::Voting => {
                let id = election.id.clone();
                let candidates = self
                    .executor
                    .run("candidates", move |store| store.candidates(&id))
                    .await?;
                if !candidates.iter().any(Candidate::is_approved) {
                    return Err(LifecycleError::PreconditionFailed {
                        target,
                        condition: "at least one approved candidate is required".to_string(),
                    }
                    .into());
                }
            }
            ElectionStatus::ResultDeclared if !results_frozen => {
                return Err(LifecycleError::PreconditionFailed {
                    target,
                    condition: "results must be frozen by declaring them".to_string(),
                }
                .into());
            }
            _ => {}
        }
        Ok(())
    }

    /// Compare-and-set from the status observed in `election` to `target`.
    pub(crate) async fn commit(
        &self,
        election: &Election,
        target: ElectionStatus,
        results: Option<ResultSnapshot>,
        actor: &Actor,
    ) -> Result<Election> {
        let id = election.id.clone();
        let transition = StatusTransition {
            from: election.status,
            to: target,
            results,
        };

        match self
            .executor
            .run("swap_status", move |store| store.swap_status(&id, &transition))
            .await?
        {
            StatusSwap::Swapped(updated) => {
                PHASE_TRANSITION_METRIC.with_label_values(&[target.as_str()]).inc();
                info!(election_id = %updated.id, from = %election.status, to = %target, "election advanced");
                self.events.publish(ElectionEvent::PhaseChanged {
                    election_id: updated.id.clone(),
                    from: election.status,
                    to: target,
                    actor: actor.to_string(),
                });
                Ok(updated)
            }
            StatusSwap::Conflict { current } => {
                warn!(election_id = %election.id, %current, "status changed underneath the transition");
                Err(LifecycleError::InvalidTransition {
                    from: current,
                    to: target,
                }
                .into())
            }
            StatusSwap::Missing => Err(ElectionError::NotFound(election.id.clone()).into()),
        }
    }
}
