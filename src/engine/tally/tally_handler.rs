use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::resolve_winner_from;
use crate::time::Clock;
use crate::Actor;
use crate::CandidateId;
use crate::DeclaredResults;
use crate::Election;
use crate::ElectionEvent;
use crate::ElectionId;
use crate::ElectionStateMachine;
use crate::ElectionStatus;
use crate::ElectionStore;
use crate::EventPublisher;
use crate::Result;
use crate::ResultSnapshot;
use crate::StoreExecutor;
use crate::TallyDiscrepancy;
use crate::TallyError;
use crate::TallyReport;
use crate::TallySource;
use crate::WinnerResolution;

/// Counts and winner resolution.
///
/// The ballot set is the ledger. Cached counters are a fast path and are never trusted when a
/// result is being frozen.
pub struct TallyHandler<S: ElectionStore> {
    executor: StoreExecutor<S>,
    lifecycle: Arc<ElectionStateMachine<S>>,
    events: EventPublisher,
    clock: Arc<dyn Clock>,
}

impl<S: ElectionStore> TallyHandler<S> {
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

    /// Votes per approved candidate, counted from the ballots. Once results are declared the
    /// frozen snapshot is returned instead.
    pub async fn tally(
        &self,
        election_id: &ElectionId,
    ) -> Result<TallyReport> {
        let election = self.lifecycle.load(election_id).await?;
        if let Some(snapshot) = &election.results {
            return Ok(TallyReport {
                election_id: election.id.clone(),
                counts: snapshot.counts.clone(),
                total_votes: snapshot.total_votes,
                source: TallySource::Snapshot,
            });
        }
        self.ledger_tally(&election).await
    }

    /// Votes per approved candidate read from the counters maintained by the ballot insert.
    pub async fn cached_tally(
        &self,
        election_id: &ElectionId,
    ) -> Result<TallyReport> {
        let election = self.lifecycle.load(election_id).await?;
        let mut counts = self.approved_zeroes(&election.id).await?;

        let id = election.id.clone();
        let cached = self
            .executor
            .run("cached_counts", move |store| store.cached_counts(&id))
            .await?;
        for (candidate_id, count) in cached {
            counts.insert(candidate_id, count);
        }

        Ok(TallyReport {
            election_id: election.id,
            total_votes: counts.values().sum(),
            counts,
            source: TallySource::Counters,
        })
    }

    /// Candidates whose cached counter disagrees with the ballot count. Empty when consistent.
    pub async fn audit_tally(
        &self,
        election_id: &ElectionId,
    ) -> Result<Vec<TallyDiscrepancy>> {
        let election = self.lifecycle.load(election_id).await?;
        let counted = self.ledger_tally(&election).await?.counts;
        let cached = self.cached_tally(election_id).await?.counts;

        let ids: BTreeSet<CandidateId> = counted.keys().chain(cached.keys()).copied().collect();
        let discrepancies: Vec<TallyDiscrepancy> = ids
            .into_iter()
            .filter_map(|candidate_id| {
                let cached = cached.get(&candidate_id).copied().unwrap_or(0);
                let counted = counted.get(&candidate_id).copied().unwrap_or(0);
                (cached != counted).then_some(TallyDiscrepancy {
                    candidate_id,
                    cached,
                    counted,
                })
            })
            .collect();

        if !discrepancies.is_empty() {
            warn!(%election_id, ?discrepancies, "cached counters drifted from ballots");
        }
        Ok(discrepancies)
    }

    /// Available once the election is `Ended` or `ResultDeclared`.
    pub async fn resolve_winner(
        &self,
        election_id: &ElectionId,
    ) -> Result<WinnerResolution> {
        let election = self.lifecycle.load(election_id).await?;
        if election.status < ElectionStatus::Ended {
            return Err(TallyError::ResultsNotAvailable {
                status: election.status,
            }
            .into());
        }
        let report = self.tally(election_id).await?;
        resolve_winner_from(&report)
    }

    /// Freezes the ballot count and moves the election from `Ended` to `ResultDeclared` in one
    /// status write. Holds the election's transition lock throughout.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn declare_results(
        &self,
        election_id: &ElectionId,
        actor: &Actor,
    ) -> Result<DeclaredResults> {
        let _guard = self.lifecycle.lock(election_id).await?;
        let election = self.lifecycle.load(election_id).await?;
        self.lifecycle
            .check_transition(&election, ElectionStatus::ResultDeclared, actor, true)
            .await?;

        // No ballot can land once the status left Voting, so this count is final
        let tally = self.ledger_tally(&election).await?;
        let winner = resolve_winner_from(&tally)?;
        let snapshot = ResultSnapshot {
            counts: tally.counts.clone(),
            total_votes: tally.total_votes,
            frozen_at: self.clock.now_millis(),
        };

        let election = self
            .lifecycle
            .commit(&election, ElectionStatus::ResultDeclared, Some(snapshot), actor)
            .await?;

        info!(
            winner = %winner.winner_candidate_id,
            votes = winner.vote_count,
            total = winner.total_votes,
            is_tie = winner.is_tie,
            "results declared"
        );
        self.events.publish(ElectionEvent::ResultsDeclared {
            election_id: election.id.clone(),
            winner: winner.clone(),
        });

        Ok(DeclaredResults {
            election,
            tally,
            winner,
        })
    }

    async fn ledger_tally(
        &self,
        election: &Election,
    ) -> Result<TallyReport> {
        let mut counts = self.approved_zeroes(&election.id).await?;

        let id = election.id.clone();
        let ballots = self.executor.run("ballots", move |store| store.ballots(&id)).await?;
        let total_votes = ballots.len() as u64;
        for ballot in ballots {
            match counts.get_mut(&ballot.candidate_id) {
                Some(count) => *count += 1,
                None => {
                    return Err(TallyError::UnknownCandidate {
                        voter: ballot.voter,
                        candidate_id: ballot.candidate_id,
                    }
                    .into())
                }
            }
        }

        Ok(TallyReport {
            election_id: election.id.clone(),
            counts,
            total_votes,
            source: TallySource::Ledger,
        })
    }

    async fn approved_zeroes(
        &self,
        election_id: &ElectionId,
    ) -> Result<BTreeMap<CandidateId, u64>> {
        let id = election_id.clone();
        let candidates = self
            .executor
            .run("candidates", move |store| store.candidates(&id))
            .await?;
        Ok(candidates
            .iter()
            .filter(|c| c.is_approved())
            .map(|c| (c.id, 0))
            .collect())
    }
}
