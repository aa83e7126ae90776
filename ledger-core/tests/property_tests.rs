//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Balance consistency: score == Σ(transaction deltas)
//! - Non-negative balance: score >= 0 after every commit
//! - Rejection is a no-op: failed changes leave score and history untouched
//! - Serialization: concurrent debits never overdraw

use proptest::prelude::*;
use scoreboard_ledger::{
    validate_score_change, Error, ErrorKind, Ledger, LedgerConfig, StoreConfig,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Strategy for generating score deltas, biased towards debits near the balance
fn delta_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        3 => -200i64..=200,
        1 => -10_000i64..=10_000,
        1 => Just(0i64),
    ]
}

/// Create test ledger with temp directory
async fn create_test_ledger() -> (Ledger, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig {
        store: StoreConfig {
            url: format!("sqlite://{}", temp_dir.path().join("ledger.db").display()),
            ..StoreConfig::default()
        },
        ..LedgerConfig::default()
    };

    let ledger = Ledger::open(config).await.unwrap();
    (ledger, temp_dir)
}

/// Score and Σ(deltas) of one participant
async fn balance_and_history_sum(ledger: &Ledger, id: i64) -> (i64, i64) {
    let score = ledger.queries().get_participant(id).await.unwrap().score;
    let sum = ledger
        .queries()
        .participant_history(id)
        .await
        .unwrap()
        .iter()
        .map(|t| t.delta)
        .sum();
    (score, sum)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: validation accepts exactly the deltas that keep the score non-negative
    #[test]
    fn prop_validation_floor(current in 0i64..1_000_000, delta in -2_000_000i64..2_000_000) {
        match validate_score_change(current, delta) {
            Ok(new_score) => {
                prop_assert!(new_score >= 0);
                prop_assert_eq!(new_score, current + delta);
            }
            Err(e) => {
                prop_assert!(current + delta < 0);
                prop_assert_eq!(e.kind(), ErrorKind::InvalidOperation);
            }
        }
    }

    /// Property: any sequence of changes keeps score == Σ(deltas) and score >= 0
    #[test]
    fn prop_score_matches_history(deltas in prop::collection::vec(delta_strategy(), 1..25)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _dir) = create_test_ledger().await;
            let alice = ledger.queries().register_participant("Alice").await.unwrap();

            let mut expected = 0i64;
            for delta in deltas {
                let before = balance_and_history_sum(&ledger, alice.id).await;

                match ledger.engine().apply_score_change(alice.id, delta).await {
                    Ok(change) => {
                        expected += delta;
                        prop_assert_eq!(change.new_score, expected);
                    }
                    Err(Error::InsufficientBalance { requested, available }) => {
                        prop_assert!(requested as i128 > available as i128);
                        // Rejected change is a no-op
                        let after = balance_and_history_sum(&ledger, alice.id).await;
                        prop_assert_eq!(before, after);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }

                let (score, sum) = balance_and_history_sum(&ledger, alice.id).await;
                prop_assert!(score >= 0);
                prop_assert_eq!(score, sum);
                prop_assert_eq!(score, expected);
            }
            Ok(())
        })?;
    }

    /// Property: participants do not share balances
    #[test]
    fn prop_participants_are_independent(
        credits in prop::collection::vec((0usize..3, 0i64..500), 1..20)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _dir) = create_test_ledger().await;
            let mut ids = Vec::new();
            for name in ["Alice", "Bob", "Carol"] {
                ids.push(ledger.queries().register_participant(name).await.unwrap().id);
            }

            let mut expected = [0i64; 3];
            for (who, amount) in credits {
                ledger.engine().apply_score_change(ids[who], amount).await.unwrap();
                expected[who] += amount;
            }

            for (i, id) in ids.iter().enumerate() {
                let (score, sum) = balance_and_history_sum(&ledger, *id).await;
                prop_assert_eq!(score, expected[i]);
                prop_assert_eq!(sum, expected[i]);
            }
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let (ledger, _dir) = create_test_ledger().await;

    let alice = ledger.queries().register_participant("Alice").await.unwrap();
    assert_eq!((alice.id, alice.full_name.as_str(), alice.score), (1, "Alice", 0));

    let change = ledger.engine().apply_score_change(1, 30).await.unwrap();
    assert_eq!(change.new_score, 30);

    let err = ledger.engine().apply_score_change(1, -50).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);

    let alice = ledger.queries().get_participant(1).await.unwrap();
    assert_eq!(alice.score, 30);

    let transactions = ledger.queries().list_transactions().await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].participant_id, 1);
    assert_eq!(transactions[0].delta, 30);
}

#[tokio::test]
async fn test_not_found_on_empty_store() {
    let (ledger, _dir) = create_test_ledger().await;

    let err = ledger.engine().apply_score_change(999, 5).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(ledger.queries().list_transactions().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_on_multi_thread_runtime() {
    let (ledger, _dir) = create_test_ledger().await;
    let ledger = Arc::new(ledger);

    let alice = ledger.queries().register_participant("Alice").await.unwrap();
    ledger.engine().apply_score_change(alice.id, 100).await.unwrap();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.engine().apply_score_change(alice.id, -10).await })
        })
        .collect();

    let mut applied = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(change) => {
                assert!(change.new_score >= 0);
                applied += 1;
            }
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::InvalidOperation, "unexpected error: {e}");
                rejected += 1;
            }
        }
    }

    assert_eq!(applied, 10);
    assert_eq!(rejected, 10);

    let (score, sum) = balance_and_history_sum(&ledger, alice.id).await;
    assert_eq!(score, 0);
    assert_eq!(sum, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_across_participants() {
    let (ledger, _dir) = create_test_ledger().await;
    let ledger = Arc::new(ledger);

    let mut ids = Vec::new();
    for i in 0..4 {
        let participant = ledger
            .queries()
            .register_participant(&format!("player-{i}"))
            .await
            .unwrap();
        ids.push(participant.id);
    }

    let handles: Vec<_> = ids
        .iter()
        .flat_map(|&id| (0..10).map(move |_| id))
        .map(|id| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.engine().apply_score_change(id, 3).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for id in ids {
        let (score, sum) = balance_and_history_sum(&ledger, id).await;
        assert_eq!(score, 30);
        assert_eq!(sum, 30);
    }
    assert_eq!(ledger.queries().list_transactions().await.unwrap().len(), 40);
}
