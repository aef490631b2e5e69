use std::sync::Arc;
use std::time::Duration;

use tracing_test::traced_test;

use super::*;
use crate::storage::election_store_test::seed;
use crate::test_utils::admin;
use crate::test_utils::candidacy;
use crate::test_utils::election;
use crate::test_utils::organizer;
use crate::Actor;
use crate::ApprovalStatus;
use crate::CandidateId;
use crate::ElectionError;
use crate::ElectionEvent;
use crate::ElectionId;
use crate::ElectionStatus;
use crate::ElectionStore;
use crate::Error;
use crate::EventPublisher;
use crate::LifecycleError;
use crate::MemoryElectionStore;
use crate::MockElectionStore;
use crate::StatusSwap;
use crate::StoreExecutor;
use crate::SystemError;

fn state_machine<S: ElectionStore>(
    store: Arc<S>,
    timeout: Duration,
) -> (ElectionStateMachine<S>, EventPublisher) {
    let events = EventPublisher::new(16);
    (
        ElectionStateMachine::new(StoreExecutor::new(store, timeout), events.clone()),
        events,
    )
}

fn add_approved_candidate(store: &Arc<MemoryElectionStore>) {
    let id = ElectionId::new("e1");
    store
        .insert_candidate(&id, &candidacy("alice"), ElectionStatus::Registration, 1)
        .unwrap();
    store
        .decide_candidate(
            &id,
            CandidateId(1),
            ApprovalStatus::Approved,
            &[ElectionStatus::Registration],
        )
        .unwrap();
}

/// # Case: full forward path
///
/// ## Criterias:
/// 1. every successor transition persists
/// 2. observed statuses never decrease
/// 3. ResultDeclared cannot be entered without frozen results
#[tokio::test]
#[traced_test]
async fn test_advance_walks_forward() {
    let store = Arc::new(MemoryElectionStore::new());
    seed(&store, "e1", ElectionStatus::Created).unwrap();
    let (sm, _) = state_machine(store.clone(), Duration::from_secs(1));
    let id = ElectionId::new("e1");

    let mut observed = vec![ElectionStatus::Created];
    let e = sm.advance(&id, ElectionStatus::Registration, &organizer()).await.unwrap();
    observed.push(e.status);

    add_approved_candidate(&store);
    let e = sm.advance(&id, ElectionStatus::Voting, &organizer()).await.unwrap();
    observed.push(e.status);
    let e = sm.advance(&id, ElectionStatus::Ended, &admin()).await.unwrap();
    observed.push(e.status);

    assert!(observed.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(
        store.election(&id).unwrap().map(|e| e.status),
        Some(ElectionStatus::Ended)
    );

    let err = sm.advance(&id, ElectionStatus::ResultDeclared, &admin()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Election(ElectionError::Lifecycle(LifecycleError::PreconditionFailed {
            target: ElectionStatus::ResultDeclared,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_advance_rejects_skips_and_backward_moves() {
    let store = Arc::new(MemoryElectionStore::new());
    seed(&store, "e1", ElectionStatus::Registration).unwrap();
    let (sm, _) = state_machine(store.clone(), Duration::from_secs(1));
    let id = ElectionId::new("e1");

    for target in [
        ElectionStatus::Created,
        ElectionStatus::Registration,
        ElectionStatus::Ended,
        ElectionStatus::ResultDeclared,
    ] {
        let err = sm.advance(&id, target, &admin()).await.unwrap_err();
        assert!(
            matches!(
                err,
                Error::Election(ElectionError::Lifecycle(LifecycleError::InvalidTransition {
                    from: ElectionStatus::Registration,
                    to,
                })) if to == target
            ),
            "unexpected error for {target}: {err:?}"
        );
    }
    assert_eq!(
        store.election(&id).unwrap().map(|e| e.status),
        Some(ElectionStatus::Registration)
    );
}

#[tokio::test]
async fn test_advance_checks_authority_before_legality() {
    let store = Arc::new(MemoryElectionStore::new());
    seed(&store, "e1", ElectionStatus::Created).unwrap();
    let (sm, _) = state_machine(store, Duration::from_secs(1));
    let id = ElectionId::new("e1");

    // Illegal target, unauthorized actor: authority wins
    let err = sm
        .advance(&id, ElectionStatus::Ended, &Actor::voter("v1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Election(ElectionError::Unauthorized { .. })));

    let err = sm
        .advance(&id, ElectionStatus::Registration, &Actor::organizer("someone-else"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Election(ElectionError::Unauthorized { action: "advance", .. })
    ));

    assert!(sm
        .advance(&id, ElectionStatus::Registration, &Actor::administrator("root"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_voting_requires_an_approved_candidate() {
    let store = Arc::new(MemoryElectionStore::new());
    seed(&store, "e1", ElectionStatus::Registration).unwrap();
    let id = ElectionId::new("e1");
    store
        .insert_candidate(&id, &candidacy("alice"), ElectionStatus::Registration, 1)
        .unwrap();
    let (sm, _) = state_machine(store, Duration::from_secs(1));

    let err = sm.advance(&id, ElectionStatus::Voting, &organizer()).await.unwrap_err();
    match err {
        Error::Election(ElectionError::Lifecycle(LifecycleError::PreconditionFailed { target, condition })) => {
            assert_eq!(target, ElectionStatus::Voting);
            assert!(condition.contains("approved candidate"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_advance_unknown_election() {
    let (sm, _) = state_machine(Arc::new(MemoryElectionStore::new()), Duration::from_secs(1));
    let err = sm
        .advance(&ElectionId::new("nope"), ElectionStatus::Registration, &admin())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Election(ElectionError::NotFound(_))));
}

#[tokio::test]
async fn test_advance_emits_phase_changed() {
    let store = Arc::new(MemoryElectionStore::new());
    seed(&store, "e1", ElectionStatus::Created).unwrap();
    let (sm, events) = state_machine(store, Duration::from_secs(1));
    let mut rx = events.subscribe();

    sm.advance(&ElectionId::new("e1"), ElectionStatus::Registration, &organizer())
        .await
        .unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        ElectionEvent::PhaseChanged {
            election_id: ElectionId::new("e1"),
            from: ElectionStatus::Created,
            to: ElectionStatus::Registration,
            actor: "organizer:org-1".to_string(),
        }
    );
}

/// Racing callers that all observed Created: exactly one transition applies and one event fires.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_advance_applies_once() {
    let store = Arc::new(MemoryElectionStore::new());
    seed(&store, "e1", ElectionStatus::Created).unwrap();
    let (sm, events) = state_machine(store, Duration::from_secs(5));
    let sm = Arc::new(sm);
    let mut rx = events.subscribe();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sm = sm.clone();
            tokio::spawn(async move {
                sm.advance(&ElectionId::new("e1"), ElectionStatus::Registration, &admin())
                    .await
            })
        })
        .collect();

    let mut applied = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(Error::Election(ElectionError::Lifecycle(LifecycleError::InvalidTransition {
                from: ElectionStatus::Registration,
                ..
            }))) => rejected += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(rejected, 7);
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
#[traced_test]
async fn test_lock_wait_is_bounded() {
    let store = Arc::new(MemoryElectionStore::new());
    seed(&store, "e1", ElectionStatus::Created).unwrap();
    let (sm, _) = state_machine(store, Duration::from_millis(30));
    let id = ElectionId::new("e1");

    let _held = sm.lock(&id).await.unwrap();
    let err = sm.advance(&id, ElectionStatus::Registration, &admin()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::System(SystemError::Timeout {
            operation: "transition_lock",
            ..
        })
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_lost_compare_and_set_reports_current_status() {
    let mut store = MockElectionStore::new();
    store
        .expect_election()
        .returning(|_| Ok(Some(election("e1", ElectionStatus::Created))));
    store.expect_swap_status().times(1).returning(|_, _| {
        Ok(StatusSwap::Conflict {
            current: ElectionStatus::Registration,
        })
    });
    let (sm, events) = state_machine(Arc::new(store), Duration::from_secs(1));
    let mut rx = events.subscribe();

    let err = sm
        .advance(&ElectionId::new("e1"), ElectionStatus::Registration, &admin())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Election(ElectionError::Lifecycle(LifecycleError::InvalidTransition {
            from: ElectionStatus::Registration,
            to: ElectionStatus::Registration,
        }))
    ));
    assert!(rx.try_recv().is_err());
}

/// # Case: a slow step fails on its own bound and names the step
///
/// ## Criterias:
/// 1. lock is free, the load exceeds the operation timeout
/// 2. error is `Timeout` for the `election` read, no status swap attempted
#[tokio::test]
async fn test_each_step_has_its_own_timeout() {
    let mut store = MockElectionStore::new();
    store.expect_election().times(1).returning(|_| {
        std::thread::sleep(Duration::from_millis(200));
        Ok(Some(election("e1", ElectionStatus::Created)))
    });
    store.expect_swap_status().never();
    let (sm, _) = state_machine(Arc::new(store), Duration::from_millis(30));

    let err = sm
        .advance(&ElectionId::new("e1"), ElectionStatus::Registration, &admin())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::System(SystemError::Timeout {
            operation: "election",
            ..
        })
    ));
}
