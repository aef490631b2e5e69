use std::sync::Arc;

use d_ballot::time::Clock;
use d_ballot::time::Timestamp;
use d_ballot::Actor;
use d_ballot::BallotConfig;
use d_ballot::CandidacyRequest;
use d_ballot::CandidateId;
use d_ballot::CreateElectionRequest;
use d_ballot::ElectionEngine;
use d_ballot::ElectionId;
use d_ballot::ElectionStatus;
use d_ballot::ElectionStore;
use d_ballot::EngineBuilder;
use d_ballot::StorageConfig;
use tempfile::TempDir;

pub const ORGANIZER: &str = "org-1";

#[derive(Debug)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now_millis(&self) -> Timestamp {
        self.0
    }
}

pub fn organizer() -> Actor {
    Actor::organizer(ORGANIZER)
}

pub fn builder(dir: &TempDir) -> EngineBuilder {
    let config = BallotConfig {
        storage: StorageConfig {
            db_root_dir: dir.path().to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    };
    EngineBuilder::from_config(config).unwrap().clock(Arc::new(FixedClock(2_500)))
}

pub fn request(id: &str) -> CreateElectionRequest {
    CreateElectionRequest {
        id: Some(ElectionId::new(id)),
        name: format!("Election {id}"),
        description: "integration".to_string(),
        registration_deadline: 1_000,
        start_time: 2_000,
        end_time: 3_000,
    }
}

pub fn candidacy(applicant: &str) -> CandidacyRequest {
    CandidacyRequest {
        applicant: applicant.to_string(),
        name: applicant.to_uppercase(),
        party: "Independent".to_string(),
        ..Default::default()
    }
}

/// Creates `id`, approves one candidate per applicant and opens voting.
pub async fn open_voting<S: ElectionStore>(
    engine: &ElectionEngine<S>,
    id: &str,
    applicants: &[&str],
) -> Vec<CandidateId> {
    let election_id = ElectionId::new(id);
    engine.create_election(request(id), &organizer()).await.unwrap();
    engine
        .advance(&election_id, ElectionStatus::Registration, &organizer())
        .await
        .unwrap();

    let mut ids = Vec::new();
    for applicant in applicants {
        let candidate = engine
            .submit_candidacy(&election_id, candidacy(applicant))
            .await
            .unwrap();
        engine
            .decide(&election_id, candidate.id, true, &organizer())
            .await
            .unwrap();
        ids.push(candidate.id);
    }
    engine
        .advance(&election_id, ElectionStatus::Voting, &organizer())
        .await
        .unwrap();
    ids
}
