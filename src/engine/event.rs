use tokio::sync::broadcast;
use tracing::trace;

use crate::ApprovalStatus;
use crate::CandidateId;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::WinnerResolution;

/// Notification emitted after a state change has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectionEvent {
    PhaseChanged {
        election_id: ElectionId,
        from: ElectionStatus,
        to: ElectionStatus,
        actor: String,
    },
    CandidateDecided {
        election_id: ElectionId,
        candidate_id: CandidateId,
        decision: ApprovalStatus,
    },
    ResultsDeclared {
        election_id: ElectionId,
        winner: WinnerResolution,
    },
}

impl ElectionEvent {
    pub fn election_id(&self) -> &ElectionId {
        match self {
            ElectionEvent::PhaseChanged { election_id, .. }
            | ElectionEvent::CandidateDecided { election_id, .. }
            | ElectionEvent::ResultsDeclared { election_id, .. } => election_id,
        }
    }
}

/// Fan-out of election events. Publishing never blocks; subscribers that fall behind by more
/// than the channel capacity observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<ElectionEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ElectionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(
        &self,
        event: ElectionEvent,
    ) {
        if let Err(e) = self.tx.send(event) {
            trace!("no subscriber for event: {:?}", e.0);
        }
    }
}
