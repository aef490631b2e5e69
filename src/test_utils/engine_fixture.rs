use crate::test_utils::candidacy;
use crate::test_utils::election_request;
use crate::test_utils::fixed_clock;
use crate::test_utils::organizer;
use crate::time::Timestamp;
use crate::BallotConfig;
use crate::CandidateId;
use crate::ElectionEngine;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::ElectionStore;
use crate::EngineBuilder;
use crate::MemoryElectionStore;

/// In-memory engine with default configuration and a clock frozen at `now`.
pub fn memory_engine(now: Timestamp) -> ElectionEngine<MemoryElectionStore> {
    EngineBuilder::from_config(BallotConfig::default())
        .expect("default configuration is valid")
        .clock(fixed_clock(now))
        .build_memory()
}

/// Creates election `id`, registers and approves one candidate per applicant, and opens
/// voting. Returns the candidate ids in applicant order.
pub async fn open_voting<S: ElectionStore>(
    engine: &ElectionEngine<S>,
    id: &str,
    applicants: &[&str],
) -> Vec<CandidateId> {
    let election_id = ElectionId::new(id);
    engine
        .create_election(election_request(id), &organizer())
        .await
        .expect("create election");
    engine
        .advance(&election_id, ElectionStatus::Registration, &organizer())
        .await
        .expect("open registration");

    let mut ids = Vec::with_capacity(applicants.len());
    for applicant in applicants {
        let candidate = engine
            .submit_candidacy(&election_id, candidacy(applicant))
            .await
            .expect("submit candidacy");
        engine
            .decide(&election_id, candidate.id, true, &organizer())
            .await
            .expect("approve candidacy");
        ids.push(candidate.id);
    }

    engine
        .advance(&election_id, ElectionStatus::Voting, &organizer())
        .await
        .expect("open voting");
    ids
}
