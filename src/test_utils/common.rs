use std::sync::Arc;

use crate::time::Clock;
use crate::time::MockClock;
use crate::time::Timestamp;
use crate::Actor;
use crate::BallotOrigin;
use crate::CandidacyRequest;
use crate::CandidateId;
use crate::CreateElectionRequest;
use crate::Election;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::VoteRecord;
use crate::VoterId;

/// Creator identity of every fixture election.
pub const ORGANIZER: &str = "org-1";

pub const REGISTRATION_DEADLINE: Timestamp = 1_000;
pub const START_TIME: Timestamp = 2_000;
pub const END_TIME: Timestamp = 3_000;

pub fn election_request(id: &str) -> CreateElectionRequest {
    CreateElectionRequest {
        id: Some(ElectionId::new(id)),
        name: format!("Election {id}"),
        description: "board seat".to_string(),
        registration_deadline: REGISTRATION_DEADLINE,
        start_time: START_TIME,
        end_time: END_TIME,
    }
}

/// Election row owned by [`ORGANIZER`], with `status` forced.
pub fn election(
    id: &str,
    status: ElectionStatus,
) -> Election {
    let mut election = election_request(id).into_election(ORGANIZER.to_string(), 500);
    election.status = status;
    election
}

pub fn candidacy(applicant: &str) -> CandidacyRequest {
    CandidacyRequest {
        applicant: applicant.to_string(),
        name: format!("Candidate {applicant}"),
        party: "Independent".to_string(),
        manifesto: "more parks".to_string(),
        image_reference: None,
    }
}

pub fn ballot(
    election_id: &str,
    voter: &str,
    candidate_id: u64,
) -> VoteRecord {
    VoteRecord {
        election_id: ElectionId::new(election_id),
        voter: VoterId::new(voter),
        candidate_id: CandidateId(candidate_id),
        cast_at: 2_500,
        origin: BallotOrigin::Direct,
    }
}

pub fn organizer() -> Actor {
    Actor::organizer(ORGANIZER)
}

pub fn admin() -> Actor {
    Actor::administrator("root")
}

/// Clock frozen at `now`.
pub fn fixed_clock(now: Timestamp) -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_now_millis().return_const(now);
    Arc::new(clock)
}
