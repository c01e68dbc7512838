//! End-to-end transfer behaviour through the public API, on the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use gobank::config::TransferConfig;
use gobank::ledger::{Fault, LedgerStore};
use gobank::{
    Currency, ErrorKind, MemoryLedgerStore, StoreError, TransferEngine, TransferError,
    TransferRequest, TransferService,
};

fn engine(store: &MemoryLedgerStore) -> TransferEngine<MemoryLedgerStore> {
    TransferEngine::new(Arc::new(store.clone()), Duration::from_secs(5))
}

#[tokio::test]
async fn qa_transfer_scenario_a_to_b() {
    let store = MemoryLedgerStore::new();
    let a = store.create_account("alice", Currency::Usd, 100);
    let b = store.create_account("bob", Currency::Usd, 50);

    let result = engine(&store).execute_transfer(a.id, b.id, 30).await.unwrap();

    assert_eq!(
        (result.transfer.from_account_id, result.transfer.to_account_id),
        (a.id, b.id)
    );
    assert_eq!(result.transfer.amount, 30);
    assert_eq!((result.from_entry.account_id, result.from_entry.amount), (a.id, -30));
    assert_eq!((result.to_entry.account_id, result.to_entry.amount), (b.id, 30));
    assert_eq!(result.from_account.balance, 70);
    assert_eq!(result.to_account.balance, 80);

    // Ledger agrees with the balances
    let a_entries = store.list_entries(a.id).await.unwrap();
    let b_entries = store.list_entries(b.id).await.unwrap();
    assert_eq!(a_entries, vec![result.from_entry.clone()]);
    assert_eq!(b_entries, vec![result.to_entry.clone()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn qa_five_concurrent_transfers() {
    let store = MemoryLedgerStore::new();
    let a = store.create_account("alice", Currency::Usd, 1000);
    let b = store.create_account("bob", Currency::Usd, 0);
    store.set_lock_hold_delay(Some(Duration::from_millis(1)));
    let engine = engine(&store);
    let (from, to) = (a.id, b.id);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.execute_transfer(from, to, 10).await })
        })
        .collect();

    let mut ks = HashSet::new();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        ks.insert((a.balance - result.from_account.balance) / 10);
    }

    assert_eq!(ks, (1..=5).collect::<HashSet<i64>>());
    assert_eq!(store.account(a.id).unwrap().balance, 950);
    assert_eq!(store.account(b.id).unwrap().balance, 50);
    assert_eq!(store.list_transfers(a.id, b.id).await.unwrap().len(), 5);
    assert_eq!(store.entry_count(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn qa_money_is_conserved_across_many_accounts() {
    let store = MemoryLedgerStore::new();
    let ids: Vec<_> = (0..6)
        .map(|i| store.create_account(&format!("u{}", i), Currency::Eur, 10_000).id)
        .collect();
    let total_before = store.total_balance();
    let engine = engine(&store);

    let mut handles = Vec::new();
    for round in 0..60usize {
        let from = ids[round % ids.len()];
        let to = ids[(round * 7 + 1) % ids.len()];
        if from == to {
            continue;
        }
        let engine = engine.clone();
        let amount = (round as i64 % 9) + 1;
        handles.push(tokio::spawn(async move {
            engine.execute_transfer(from, to, amount).await
        }));
    }

    let expected = handles.len();
    tokio::time::timeout(Duration::from_secs(10), async {
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            // Each transfer's two entries cancel out
            assert_eq!(result.from_entry.amount + result.to_entry.amount, 0);
        }
    })
    .await
    .expect("transfers over overlapping accounts must not deadlock");

    assert_eq!(store.total_balance(), total_before);
    assert_eq!(store.transfer_count(), expected);
    assert_eq!(store.entry_count(), expected * 2);
}

#[tokio::test]
async fn qa_failure_after_transfer_insert_leaves_nothing() {
    let store = MemoryLedgerStore::new();
    let a = store.create_account("alice", Currency::Usd, 100);
    let b = store.create_account("bob", Currency::Usd, 50);
    store.inject_fault(Fault::InsertEntry, StoreError::Unavailable("connection lost".into()));

    let err = engine(&store).execute_transfer(a.id, b.id, 30).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(store.list_transfers(a.id, b.id).await.unwrap().is_empty());
    assert!(store.list_entries(a.id).await.unwrap().is_empty());
    assert_eq!(store.account(a.id).unwrap().balance, 100);
    assert_eq!(store.account(b.id).unwrap().balance, 50);
}

#[tokio::test]
async fn qa_same_account_rejected_for_any_amount() {
    let store = MemoryLedgerStore::new();
    let a = store.create_account("alice", Currency::Usd, 100);
    let engine = engine(&store);

    for amount in [i64::MIN, -1, 0, 1, 100, i64::MAX] {
        let err = engine.execute_transfer(a.id, a.id, amount).await.unwrap_err();
        assert_eq!(err, TransferError::SameAccount(a.id));
    }
    assert_eq!(store.begin_count(), 0);
}

#[tokio::test]
async fn qa_service_end_to_end() {
    let store = MemoryLedgerStore::new();
    let a = store.create_account("alice", Currency::Egp, 500);
    let b = store.create_account("bob", Currency::Egp, 0);
    let config = TransferConfig::default();
    let service = TransferService::new(
        TransferEngine::new(Arc::new(store.clone()), config.tx_timeout()),
        store.clone(),
        &config,
    );

    let result = service
        .transfer(&TransferRequest::new(a.id, b.id, 125).with_owner("alice"))
        .await
        .unwrap();
    assert_eq!(result.from_account.balance, 375);
    assert_eq!(result.to_account.balance, 125);

    let err = service
        .transfer(&TransferRequest::new(a.id, b.id, 1).with_owner("mallory"))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 403);
}
