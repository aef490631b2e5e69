use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::BallotOrigin;
use crate::CandidacyError;
use crate::CandidacyRequest;
use crate::CandidateId;
use crate::ElectionEngine;
use crate::ElectionError;
use crate::ElectionId;
use crate::ElectionStore;
use crate::Error;
use crate::ErrorKind;
use crate::IngestOutcome;
use crate::IngestStats;
use crate::LedgerConfig;
use crate::LedgerFact;
use crate::Result;
use crate::VoterId;

/// Bounded channel sized by `ledger.ingest_buffer_size`.
pub fn ingest_channel(config: &LedgerConfig) -> Result<(mpsc::Sender<LedgerFact>, mpsc::Receiver<LedgerFact>)> {
    config.validate()?;
    Ok(mpsc::channel(config.ingest_buffer_size))
}

/// Applies ledger facts to an engine.
///
/// Rule violations are turned into [`IngestOutcome::Rejected`]. Only store failures surface as
/// errors, and those leave the fact unapplied so the adapter can replay it.
pub struct LedgerIngestor<S: ElectionStore> {
    engine: Arc<ElectionEngine<S>>,
}

impl<S: ElectionStore> LedgerIngestor<S> {
    pub fn new(engine: Arc<ElectionEngine<S>>) -> Self {
        Self { engine }
    }

    #[instrument(skip(self, fact), fields(election_id = %fact.election_id(), block_height = fact.block_height()))]
    pub async fn ingest(
        &self,
        fact: LedgerFact,
    ) -> Result<IngestOutcome> {
        match fact {
            LedgerFact::VoteCast {
                election_id,
                voter,
                candidate_id,
                block_height,
                tx_ref,
            } => {
                self.ingest_vote(
                    &election_id,
                    &voter,
                    candidate_id,
                    BallotOrigin::Ledger { block_height, tx_ref },
                )
                .await
            }
            LedgerFact::CandidateRegistered {
                election_id, request, ..
            } => self.ingest_candidacy(&election_id, request).await,
        }
    }

    async fn ingest_vote(
        &self,
        election_id: &ElectionId,
        voter: &VoterId,
        candidate_id: CandidateId,
        origin: BallotOrigin,
    ) -> Result<IngestOutcome> {
        match self
            .engine
            .record_ballot(election_id, voter, candidate_id, origin)
            .await
        {
            Ok(_) => Ok(IngestOutcome::Applied),
            Err(e) if e.is_already_voted() => {
                let existing = self.engine.ballot_for(election_id, voter).await?;
                match existing {
                    Some(receipt) if receipt.candidate_id == candidate_id => Ok(IngestOutcome::Duplicate),
                    Some(receipt) => {
                        warn!(%voter, existing = %receipt.candidate_id, %candidate_id, "ledger vote conflicts with recorded ballot");
                        Ok(IngestOutcome::Conflict {
                            existing: receipt.candidate_id,
                        })
                    }
                    // AlreadyVoted without a stored ballot means the store broke its own contract
                    None => Err(e),
                }
            }
            Err(e) => rejected_or_failed(e),
        }
    }

    async fn ingest_candidacy(
        &self,
        election_id: &ElectionId,
        request: CandidacyRequest,
    ) -> Result<IngestOutcome> {
        match self.engine.submit_candidacy(election_id, request).await {
            Ok(candidate) => {
                debug!(candidate_id = %candidate.id, "ledger candidacy registered");
                Ok(IngestOutcome::Applied)
            }
            Err(Error::Election(ElectionError::Candidacy(CandidacyError::DuplicateCandidate { .. }))) => {
                Ok(IngestOutcome::Duplicate)
            }
            Err(e) => rejected_or_failed(e),
        }
    }

    /// Drains `facts` until the channel closes or `shutdown` fires.
    ///
    /// Store failures are logged and counted in [`IngestStats::failed`]; the loop keeps going.
    pub async fn run(
        &self,
        mut facts: mpsc::Receiver<LedgerFact>,
        mut shutdown: watch::Receiver<()>,
    ) -> IngestStats {
        let mut stats = IngestStats::default();
        loop {
            tokio::select! {
                // Use biased to ensure branch order
                biased;
                // P0: shutdown received;
                _ = shutdown.changed() => {
                    info!("ledger ingest shutdown signal received.");
                    break;
                }
                // P1: next fact
                fact = facts.recv() => {
                    let Some(fact) = fact else {
                        info!("ledger channel closed.");
                        break;
                    };
                    match self.ingest(fact).await {
                        Ok(outcome) => {
                            debug!(?outcome, "ledger fact ingested");
                            stats.observe(&outcome);
                        }
                        Err(e) => {
                            error!("ledger fact failed: {:?}", e);
                            stats.failed += 1;
                        }
                    }
                }
            }
        }
        info!(?stats, "ledger ingest stopped");
        stats
    }
}

fn rejected_or_failed(e: Error) -> Result<IngestOutcome> {
    match e.kind() {
        ErrorKind::Legality => {
            debug!("ledger fact rejected: {}", e);
            Ok(IngestOutcome::Rejected { reason: e.to_string() })
        }
        ErrorKind::Infrastructure => Err(e),
    }
}
