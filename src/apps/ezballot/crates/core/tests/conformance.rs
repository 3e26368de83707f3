//! Conformance tests for the ezballot ledger.
//!
//! Each test names the property it checks.

use ezballot_core::{
    Address, Command, ElectionState, Error, EventKind, Ledger, LedgerService, SignedCommand,
    SigningKey,
};
use proptest::prelude::*;
use rand::rngs::OsRng;

// =============================================================================
// Test Utilities
// =============================================================================

const ADMIN: Address = Address([0xad; 20]);
const V1: Address = Address([1; 20]);
const V2: Address = Address([2; 20]);

/// Alice, Bob and Charlie with V1 and V2 eligible.
fn three_way_race() -> Ledger {
    Ledger::new(["Alice", "Bob", "Charlie"], [V1, V2], ADMIN).unwrap()
}

fn voter(n: u8) -> Address {
    Address([n; 20])
}

// =============================================================================
// CN: Construction
// =============================================================================

/// CN-01: Contiguous Registration
///
/// Property: N names yield N candidates with indices 0..N-1 and zero votes.
#[test]
fn cn_01_contiguous_registration() {
    let names: Vec<String> = (0..12).map(|i| format!("candidate-{i}")).collect();
    let ledger = Ledger::new(names.clone(), [V1], ADMIN).unwrap();

    assert_eq!(ledger.candidates_count(), names.len());
    for (i, candidate) in ledger.candidates().iter().enumerate() {
        assert_eq!(candidate.id, i as u64);
        assert_eq!(candidate.name, names[i]);
        assert_eq!(candidate.vote_count, 0);
    }
}

/// CN-02: Fixed Electorate
///
/// Property: exactly the listed identities are eligible, none has voted.
#[test]
fn cn_02_fixed_electorate() {
    let ledger = three_way_race();

    assert!(ledger.is_eligible(&V1));
    assert!(ledger.is_eligible(&V2));
    assert!(!ledger.is_eligible(&ADMIN));
    assert!(!ledger.has_voted(&V1));
    assert!(!ledger.has_voted(&V2));
}

// =============================================================================
// LC: Lifecycle
// =============================================================================

/// LC-01: Non-admin Transitions
///
/// Property: start/end by a non-admin fail with Unauthorized and keep state.
#[test]
fn lc_01_non_admin_transitions() {
    let mut ledger = three_way_race();

    assert_eq!(ledger.start_voting(&V1), Err(Error::Unauthorized));
    assert_eq!(ledger.election_state(), ElectionState::Inactive);

    ledger.start_voting(&ADMIN).unwrap();
    assert_eq!(ledger.end_voting(&V2), Err(Error::Unauthorized));
    assert_eq!(ledger.election_state(), ElectionState::Active);
}

/// LC-02: No Skipping
///
/// Property: end while Inactive fails with InvalidStateTransition.
#[test]
fn lc_02_no_skipping() {
    let mut ledger = three_way_race();

    assert_eq!(
        ledger.end_voting(&ADMIN),
        Err(Error::InvalidStateTransition {
            from: ElectionState::Inactive,
            to: ElectionState::Ended,
        })
    );
    assert_eq!(ledger.election_state(), ElectionState::Inactive);
}

/// LC-03: Ended Is Terminal
///
/// Property: nothing leaves Ended.
#[test]
fn lc_03_ended_is_terminal() {
    let mut ledger = three_way_race();
    ledger.start_voting(&ADMIN).unwrap();
    ledger.end_voting(&ADMIN).unwrap();

    assert!(matches!(
        ledger.start_voting(&ADMIN),
        Err(Error::InvalidStateTransition { .. })
    ));
    assert!(matches!(
        ledger.end_voting(&ADMIN),
        Err(Error::InvalidStateTransition { .. })
    ));
    assert_eq!(ledger.election_state(), ElectionState::Ended);
}

// =============================================================================
// VT: Voting
// =============================================================================

/// VT-01: Voting Window
///
/// Property: votes before start and after end fail with VotingNotActive.
#[test]
fn vt_01_voting_window() {
    let mut ledger = three_way_race();

    assert_eq!(ledger.vote(0, &V1), Err(Error::VotingNotActive));
    assert_eq!(ledger.tally(), vec![0, 0, 0]);

    ledger.start_voting(&ADMIN).unwrap();
    ledger.end_voting(&ADMIN).unwrap();

    assert_eq!(ledger.vote(0, &V1), Err(Error::VotingNotActive));
    assert_eq!(ledger.tally(), vec![0, 0, 0]);
}

/// VT-02: One Vote Per Voter
///
/// Property: a second vote, same or different candidate, is AlreadyVoted.
#[test]
fn vt_02_one_vote_per_voter() {
    let mut ledger = three_way_race();
    ledger.start_voting(&ADMIN).unwrap();
    ledger.vote(0, &V1).unwrap();

    assert_eq!(ledger.vote(0, &V1), Err(Error::AlreadyVoted));
    assert_eq!(ledger.vote(2, &V1), Err(Error::AlreadyVoted));
    assert_eq!(ledger.tally(), vec![1, 0, 0]);
}

/// VT-03: Out Of Range
///
/// Property: an index past the last candidate is InvalidCandidate.
#[test]
fn vt_03_out_of_range() {
    let mut ledger = three_way_race();
    ledger.start_voting(&ADMIN).unwrap();

    assert_eq!(ledger.vote(3, &V1), Err(Error::InvalidCandidate(3)));
    assert_eq!(ledger.vote(u64::MAX, &V1), Err(Error::InvalidCandidate(u64::MAX)));
    assert!(!ledger.has_voted(&V1));
}

/// VT-04: Reference Scenario
///
/// Property: the canonical walk-through ends with tally [1, 1, 0].
#[test]
fn vt_04_reference_scenario() {
    let mut ledger = three_way_race();

    ledger.start_voting(&ADMIN).unwrap();
    assert_eq!(ledger.election_state(), ElectionState::Active);

    ledger.vote(0, &V1).unwrap();
    assert_eq!(ledger.candidate(0).unwrap().vote_count, 1);

    assert_eq!(ledger.vote(0, &V1), Err(Error::AlreadyVoted));
    assert_eq!(ledger.candidate(0).unwrap().vote_count, 1);

    assert_eq!(ledger.vote(99, &V2), Err(Error::InvalidCandidate(99)));

    ledger.vote(1, &V2).unwrap();
    assert_eq!(ledger.candidate(1).unwrap().vote_count, 1);

    ledger.end_voting(&ADMIN).unwrap();
    assert_eq!(ledger.election_state(), ElectionState::Ended);

    assert_eq!(ledger.vote(2, &V2), Err(Error::VotingNotActive));
    assert_eq!(ledger.tally(), vec![1, 1, 0]);
}

// =============================================================================
// AU: Auditability
// =============================================================================

/// AU-01: History Mirrors Mutations
///
/// Property: the audit trail lists exactly the accepted mutations, in order.
#[test]
fn au_01_history_mirrors_mutations() {
    let mut ledger = three_way_race();
    ledger.start_voting(&ADMIN).unwrap();
    ledger.vote(2, &V2).unwrap();
    let _ = ledger.vote(2, &V2);
    ledger.end_voting(&ADMIN).unwrap();

    let kinds: Vec<EventKind> = ledger.history().iter().map(|e| e.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::VotingStarted { by: ADMIN },
            EventKind::VoteCast {
                voter: V2,
                candidate: 2,
            },
            EventKind::VotingEnded { by: ADMIN },
        ]
    );
}

/// AU-02: State Hash Tracks Accepted Mutations
///
/// Property: accepted mutations change the hash, rejected ones do not.
#[test]
fn au_02_state_hash_tracks_mutations() {
    let mut ledger = three_way_race();
    let h0 = ledger.state_hash().unwrap();

    let _ = ledger.vote(0, &V1);
    assert_eq!(ledger.state_hash().unwrap(), h0);

    ledger.start_voting(&ADMIN).unwrap();
    let h1 = ledger.state_hash().unwrap();
    assert_ne!(h1, h0);

    ledger.vote(0, &V1).unwrap();
    let h2 = ledger.state_hash().unwrap();
    assert_ne!(h2, h1);

    let _ = ledger.vote(1, &V1);
    assert_eq!(ledger.state_hash().unwrap(), h2);
}

/// AU-03: Snapshot Survives Persistence
///
/// Property: JSON round trip restores an identical, valid ledger.
#[test]
fn au_03_snapshot_survives_persistence() {
    let mut ledger = three_way_race();
    ledger.start_voting(&ADMIN).unwrap();
    ledger.vote(1, &V1).unwrap();

    let json = serde_json::to_string_pretty(&ledger.snapshot()).unwrap();
    let restored = Ledger::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(restored, ledger);
    assert!(restored.has_voted(&V1));
    assert!(restored.is_voting_active());
}

// =============================================================================
// CC: Concurrency
// =============================================================================

/// CC-01: Racing Duplicate Votes
///
/// Property: many concurrent submissions of one voter's vote accept exactly one.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cc_01_racing_duplicate_votes() {
    let admin = SigningKey::generate(&mut OsRng);
    let voter_key = SigningKey::generate(&mut OsRng);
    let admin_address = Address::from_public_key(&admin.verifying_key());
    let voter_address = Address::from_public_key(&voter_key.verifying_key());

    let ledger = Ledger::new(["Alice", "Bob"], [voter_address], admin_address).unwrap();
    let service = LedgerService::new(ledger);
    service
        .execute(&admin_address, &Command::StartVoting)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16u64 {
        let service = service.clone();
        let signed = SignedCommand::new(Command::Vote { candidate: i % 2 }, &voter_key).unwrap();
        handles.push(tokio::spawn(async move { service.submit(&signed).await }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e, Error::AlreadyVoted),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(service.tally().await.iter().sum::<u64>(), 1);
}

/// CC-02: Many Voters In Parallel
///
/// Property: concurrent distinct voters all land and the tally adds up.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cc_02_many_voters_in_parallel() {
    let voters: Vec<Address> = (1..=50).map(voter).collect();
    let ledger = Ledger::new(["Alice", "Bob", "Charlie"], voters.clone(), ADMIN).unwrap();
    let service = LedgerService::new(ledger);
    service.execute(&ADMIN, &Command::StartVoting).await.unwrap();

    let mut handles = Vec::new();
    for (i, address) in voters.into_iter().enumerate() {
        let service = service.clone();
        let command = Command::Vote {
            candidate: (i % 3) as u64,
        };
        handles.push(tokio::spawn(async move {
            service.execute(&address, &command).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(service.tally().await, vec![17, 17, 16]);
    let snapshot = service.snapshot().await;
    assert!(Ledger::from_snapshot(snapshot).is_ok());
}

// =============================================================================
// PT: Property Tests
// =============================================================================

#[derive(Clone, Debug)]
enum Step {
    Start(u8),
    End(u8),
    Vote(u64, u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..4).prop_map(Step::Start),
        (0u8..4).prop_map(Step::End),
        ((0u64..5), (0u8..8)).prop_map(|(c, v)| Step::Vote(c, v)),
    ]
}

/// 0 is the admin, 1..=5 are eligible, 6 and 7 are strangers.
fn caller(n: u8) -> Address {
    if n == 0 {
        ADMIN
    } else {
        voter(n)
    }
}

proptest! {
    /// PT-01: Tally Equals Successful Voters
    ///
    /// Property: for any sequence of calls, the tally sum equals the number of
    /// distinct identities whose vote succeeded, and every invariant holds.
    #[test]
    fn pt_01_tally_equals_successful_voters(steps in proptest::collection::vec(step(), 0..64)) {
        let electorate: Vec<Address> = (1..=5).map(voter).collect();
        let mut ledger = Ledger::new(["Alice", "Bob", "Charlie"], electorate, ADMIN).unwrap();
        let mut succeeded = std::collections::BTreeSet::new();

        for step in steps {
            let before = ledger.clone();
            let accepted = match step {
                Step::Start(n) => ledger.start_voting(&caller(n)).is_ok(),
                Step::End(n) => ledger.end_voting(&caller(n)).is_ok(),
                Step::Vote(c, n) => {
                    let ok = ledger.vote(c, &caller(n)).is_ok();
                    if ok {
                        prop_assert!(succeeded.insert(caller(n)), "second vote accepted");
                    }
                    ok
                }
            };
            if !accepted {
                prop_assert_eq!(&ledger, &before);
            }
        }

        prop_assert_eq!(ledger.total_votes(), succeeded.len() as u64);
        prop_assert!(ledger.verify_invariants().is_ok());
    }
}
