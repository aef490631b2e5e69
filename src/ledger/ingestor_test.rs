use std::sync::Arc;

use tokio::sync::watch;
use tracing_test::traced_test;

use super::*;
use crate::test_utils::candidacy;
use crate::test_utils::election;
use crate::test_utils::fixed_clock;
use crate::test_utils::memory_engine;
use crate::test_utils::open_voting;
use crate::BallotConfig;
use crate::BallotOrigin;
use crate::CandidateId;
use crate::ElectionEngine;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::EngineBuilder;
use crate::LedgerConfig;
use crate::MemoryElectionStore;
use crate::MockElectionStore;
use crate::StorageError;
use crate::VoterId;

fn vote(
    voter: &str,
    candidate_id: CandidateId,
    block_height: u64,
) -> LedgerFact {
    LedgerFact::VoteCast {
        election_id: ElectionId::new("e1"),
        voter: VoterId::new(voter),
        candidate_id,
        block_height,
        tx_ref: format!("0xtx{block_height}"),
    }
}

async fn voting_engine(applicants: &[&str]) -> (Arc<ElectionEngine<MemoryElectionStore>>, Vec<CandidateId>) {
    let engine = memory_engine(2_500);
    let ids = open_voting(&engine, "e1", applicants).await;
    (Arc::new(engine), ids)
}

#[tokio::test]
#[traced_test]
async fn test_vote_fact_is_applied_once() {
    let (engine, ids) = voting_engine(&["alice", "bob"]).await;
    let ingestor = LedgerIngestor::new(engine.clone());

    assert_eq!(ingestor.ingest(vote("v1", ids[0], 10)).await.unwrap(), IngestOutcome::Applied);
    assert_eq!(ingestor.ingest(vote("v1", ids[0], 10)).await.unwrap(), IngestOutcome::Duplicate);

    let report = engine.tally(&ElectionId::new("e1")).await.unwrap();
    assert_eq!(report.count_for(ids[0]), 1);
    assert_eq!(report.total_votes, 1);
}

#[tokio::test]
async fn test_vote_fact_for_other_candidate_conflicts() {
    let (engine, ids) = voting_engine(&["alice", "bob"]).await;
    let ingestor = LedgerIngestor::new(engine.clone());
    let id = ElectionId::new("e1");

    engine.cast_vote(&id, &VoterId::new("v1"), ids[1]).await.unwrap();

    let outcome = ingestor.ingest(vote("v1", ids[0], 11)).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Conflict { existing: ids[1] });
    assert_eq!(engine.tally(&id).await.unwrap().count_for(ids[0]), 0);
}

#[tokio::test]
async fn test_vote_fact_outside_voting_is_rejected() {
    let (engine, ids) = voting_engine(&["alice"]).await;
    let ingestor = LedgerIngestor::new(engine.clone());
    engine
        .advance(&ElectionId::new("e1"), ElectionStatus::Ended, &crate::test_utils::organizer())
        .await
        .unwrap();

    match ingestor.ingest(vote("late", ids[0], 99)).await.unwrap() {
        IngestOutcome::Rejected { reason } => assert!(reason.contains("Voting is not open")),
        other => panic!("expected rejection, got {other:?}"),
    }
    match ingestor.ingest(vote("v2", CandidateId(42), 99)).await.unwrap() {
        IngestOutcome::Rejected { .. } => {}
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ledger_ballot_keeps_its_origin() {
    let (engine, ids) = voting_engine(&["alice"]).await;
    let ingestor = LedgerIngestor::new(engine.clone());

    ingestor.ingest(vote("v1", ids[0], 7)).await.unwrap();

    let store_view = engine.ballot_for(&ElectionId::new("e1"), &VoterId::new("v1")).await.unwrap();
    assert_eq!(store_view.map(|r| r.candidate_id), Some(ids[0]));
    assert_eq!(
        BallotOrigin::Ledger {
            block_height: 7,
            tx_ref: "0xtx7".into()
        }
        .label(),
        "ledger"
    );
}

#[tokio::test]
async fn test_candidate_registration_fact() {
    let engine = Arc::new(memory_engine(0));
    let id = ElectionId::new("e1");
    engine
        .create_election(crate::test_utils::election_request("e1"), &crate::test_utils::organizer())
        .await
        .unwrap();
    let ingestor = LedgerIngestor::new(engine.clone());
    let fact = LedgerFact::CandidateRegistered {
        election_id: id.clone(),
        request: candidacy("alice"),
        block_height: 3,
    };

    // Registration is not open yet
    assert!(matches!(
        ingestor.ingest(fact.clone()).await.unwrap(),
        IngestOutcome::Rejected { .. }
    ));

    engine
        .advance(&id, ElectionStatus::Registration, &crate::test_utils::organizer())
        .await
        .unwrap();
    assert_eq!(ingestor.ingest(fact.clone()).await.unwrap(), IngestOutcome::Applied);
    assert_eq!(ingestor.ingest(fact).await.unwrap(), IngestOutcome::Duplicate);
    assert_eq!(engine.candidates(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_failure_is_an_error_not_a_rejection() {
    let mut store = MockElectionStore::new();
    store
        .expect_insert_ballot()
        .returning(|_| Err(StorageError::DbError("disk gone".into()).into()));
    let engine = EngineBuilder::from_config(BallotConfig::default())
        .unwrap()
        .clock(fixed_clock(2_500))
        .build_with_store(Arc::new(store));
    let ingestor = LedgerIngestor::new(Arc::new(engine));

    let err = ingestor.ingest(vote("v1", CandidateId(1), 1)).await.unwrap_err();
    assert!(err.is_retryable());
}

/// # Case: the run loop drains the channel and stops when it closes
///
/// ## Criterias:
/// 1. every fact is classified exactly once
/// 2. stats match the outcomes
#[tokio::test]
#[traced_test]
async fn test_run_until_channel_closes() {
    let (engine, ids) = voting_engine(&["alice", "bob"]).await;
    let ingestor = LedgerIngestor::new(engine.clone());
    let (tx, rx) = ingest_channel(&LedgerConfig::default()).unwrap();
    let (_shutdown_tx, shutdown_rx) = watch::channel(());

    let facts = vec![
        vote("v1", ids[0], 1),
        vote("v2", ids[1], 2),
        vote("v1", ids[0], 1),
        vote("v2", ids[0], 3),
        vote("v3", CandidateId(99), 4),
    ];
    for fact in facts {
        tx.send(fact).await.unwrap();
    }
    drop(tx);

    let stats = ingestor.run(rx, shutdown_rx).await;

    assert_eq!(
        stats,
        IngestStats {
            applied: 2,
            duplicates: 1,
            conflicts: 1,
            rejected: 1,
            failed: 0,
        }
    );
    assert_eq!(stats.total(), 5);
    assert!(logs_contain("ledger channel closed"));
    assert!(engine.audit_tally(&ElectionId::new("e1")).await.unwrap().is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_run_stops_on_shutdown() {
    let (engine, _) = voting_engine(&["alice"]).await;
    let ingestor = LedgerIngestor::new(engine);
    let (_tx, rx) = ingest_channel(&LedgerConfig::default()).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    shutdown_tx.send(()).unwrap();

    let stats = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        ingestor.run(rx, shutdown_rx),
    )
    .await
    .expect("run loop should stop");
    assert_eq!(stats, IngestStats::default());
    assert!(logs_contain("ledger ingest shutdown signal received"));
}

#[test]
fn test_fact_accessors() {
    let fact = vote("v1", CandidateId(1), 12);
    assert_eq!(fact.election_id(), &ElectionId::new("e1"));
    assert_eq!(fact.block_height(), 12);

    let registered = LedgerFact::CandidateRegistered {
        election_id: election("e2", ElectionStatus::Registration).id,
        request: candidacy("bob"),
        block_height: 4,
    };
    assert_eq!(registered.election_id().as_str(), "e2");
}
