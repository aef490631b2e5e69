//! Election Engine Error Hierarchy
//!
//! Errors are split into two families:
//! - legality violations raised by the lifecycle, candidacy, ballot and tally rules, which are
//!   terminal and carry enough context to render a precise message;
//! - infrastructure failures (store, timeout, serialization) which a caller may retry after
//!   re-querying state.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::ApprovalStatus;
use crate::CandidateId;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::VoterId;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (storage, timeouts, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Election rule violations
    #[error(transparent)]
    Election(#[from] ElectionError),
}

/// Coarse classification used by callers to decide between rendering a message and retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A rule of the election was violated. Never retried.
    Legality,
    /// The store or runtime failed. Retry only after re-querying state.
    Infrastructure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Election(_) => ErrorKind::Legality,
            Error::System(_) | Error::Config(_) => ErrorKind::Infrastructure,
        }
    }

    /// `true` for failures where the outcome of the write is unknown or the store was unreachable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::System(SystemError::Timeout { .. })
                | Error::System(SystemError::StoreUnavailable(_))
                | Error::System(SystemError::Storage(StorageError::DbError(_)))
        )
    }

    pub fn is_already_voted(&self) -> bool {
        matches!(
            self,
            Error::Election(ElectionError::Ballot(BallotError::AlreadyVoted { .. }))
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ElectionError {
    /// Phase transition rule violations
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Candidate admission rule violations
    #[error(transparent)]
    Candidacy(#[from] CandidacyError),

    /// Vote casting rule violations
    #[error(transparent)]
    Ballot(#[from] BallotError),

    /// Result computation rule violations
    #[error(transparent)]
    Tally(#[from] TallyError),

    #[error("Election {0} not found")]
    NotFound(ElectionId),

    #[error("Election {0} already exists")]
    AlreadyExists(ElectionId),

    /// Actor lacks management or authority rights over the election
    #[error("{actor} is not allowed to {action} in election {election_id}")]
    Unauthorized {
        actor: String,
        action: &'static str,
        election_id: ElectionId,
    },

    /// Request rejected at the boundary before reaching any rule
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Target is not the immediate successor of the persisted status
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ElectionStatus,
        to: ElectionStatus,
    },

    /// A guard attached to the target phase does not hold
    #[error("Cannot enter {target}: {condition}")]
    PreconditionFailed {
        target: ElectionStatus,
        condition: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CandidacyError {
    #[error("Registration is closed (election status: {status})")]
    RegistrationClosed { status: ElectionStatus },

    #[error("Applicant {applicant} already holds candidacy {existing}")]
    DuplicateCandidate {
        applicant: String,
        existing: CandidateId,
    },

    /// Decisions are final once taken
    #[error("Candidate {candidate_id} was already decided: {current}")]
    AlreadyDecided {
        candidate_id: CandidateId,
        current: ApprovalStatus,
    },

    #[error("Candidate {candidate_id} not found")]
    NotFound { candidate_id: CandidateId },

    #[error("Candidate decisions are closed (election status: {status})")]
    DecisionWindowClosed { status: ElectionStatus },
}

#[derive(Debug, thiserror::Error)]
pub enum BallotError {
    #[error("Voting is not open (election status: {status})")]
    VotingNotOpen { status: ElectionStatus },

    #[error("Candidate {candidate_id} is not eligible to receive votes")]
    CandidateNotEligible { candidate_id: CandidateId },

    /// Expected outcome for retries and replays; not a system failure
    #[error("Voter {voter} has already voted in election {election_id}")]
    AlreadyVoted {
        election_id: ElectionId,
        voter: VoterId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    #[error("Results are not available while election is {status}")]
    ResultsNotAvailable { status: ElectionStatus },

    #[error("Election has no approved candidates")]
    NoCandidates,

    /// A ballot references a candidate outside the approved set
    #[error("Ballot of voter {voter} references unknown candidate {candidate_id}")]
    UnknownCandidate {
        voter: VoterId,
        candidate_id: CandidateId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Storage operation failed")]
    Storage(#[from] StorageError),

    #[error("Serialization error")]
    Serialization(#[from] SerializationError),

    /// The store did not answer within the bound. The write may still have been applied.
    #[error("Store operation {operation} timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Persisted bytes could not be interpreted
    #[error("Data corruption detected at {location}")]
    DataCorruption { location: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

// ============== Conversion Implementations ============== //
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        SerializationError::Bincode(e).into()
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        Error::System(SystemError::StoreUnavailable(err.to_string()))
    }
}

// ===== Election Error conversions =====

impl From<LifecycleError> for Error {
    fn from(e: LifecycleError) -> Self {
        Error::Election(ElectionError::Lifecycle(e))
    }
}

impl From<CandidacyError> for Error {
    fn from(e: CandidacyError) -> Self {
        Error::Election(ElectionError::Candidacy(e))
    }
}

impl From<BallotError> for Error {
    fn from(e: BallotError) -> Self {
        Error::Election(ElectionError::Ballot(e))
    }
}

impl From<TallyError> for Error {
    fn from(e: TallyError) -> Self {
        Error::Election(ElectionError::Tally(e))
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::System(SystemError::Metrics(e.to_string()))
    }
}
