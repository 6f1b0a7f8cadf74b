//! Upload ledger tests over real SQLite files.

use std::collections::HashSet;

use snapped::api::LocalImageRef;
use snapped::error::ErrorKind;
use snapped::ledger::{KvStore, Ledger, LedgerEntry, SqliteStore, UPLOADS_KEY};
use tempfile::TempDir;

fn entry(n: i64) -> LedgerEntry {
    LedgerEntry::new(LocalImageRef::new(format!("/tmp/shot-{n}.jpg")))
        .with_server_path(format!("app/static/uploads/shot-{n}.jpg"))
        .with_search_id(n)
}

fn search_ids(entries: &[LedgerEntry]) -> Vec<i64> {
    entries.iter().filter_map(|e| e.search_id).collect()
}

// ===== Persistence =====

#[tokio::test]
async fn test_entries_survive_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nested").join("ledger.db");

    {
        let ledger = Ledger::spawn(SqliteStore::open(&db).unwrap()).unwrap();
        ledger.append(entry(1)).await.unwrap();
        ledger.append(entry(2)).await.unwrap();
    }

    let reopened = Ledger::spawn(SqliteStore::open(&db).unwrap()).unwrap();
    let entries = reopened.list_all().await.unwrap();
    assert_eq!(search_ids(&entries), vec![2, 1]);
    assert_eq!(
        entries[0].server_path.as_deref(),
        Some("app/static/uploads/shot-2.jpg")
    );
}

#[tokio::test]
async fn test_empty_database_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::spawn(SqliteStore::open(dir.path().join("ledger.db")).unwrap()).unwrap();

    assert!(ledger.list_all().await.unwrap().is_empty());
    assert!(ledger.latest().await.unwrap().is_none());
}

// ===== Capping =====

#[tokio::test]
async fn test_default_capacity_keeps_newest_200() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::spawn(SqliteStore::open(dir.path().join("ledger.db")).unwrap()).unwrap();
    assert_eq!(ledger.capacity(), 200);

    let mut last_len = 0;
    for n in 1..=205 {
        last_len = ledger.append(entry(n)).await.unwrap();
    }
    assert_eq!(last_len, 200);

    let entries = ledger.list_all().await.unwrap();
    assert_eq!(entries.len(), 200);
    assert_eq!(entries.first().and_then(|e| e.search_id), Some(205));
    assert_eq!(entries.last().and_then(|e| e.search_id), Some(6));
}

// ===== Concurrency =====

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_are_all_kept() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::spawn(SqliteStore::open(dir.path().join("ledger.db")).unwrap()).unwrap();

    let tasks: Vec<_> = (1..=25)
        .map(|n| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.append(entry(n)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let entries = ledger.list_all().await.unwrap();
    assert_eq!(entries.len(), 25);
    let unique: HashSet<i64> = search_ids(&entries).into_iter().collect();
    assert_eq!(unique.len(), 25);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_ledgers_on_one_file_keep_every_entry() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("snapped.db");
    // Each `snapped search` process opens its own store and worker.
    let first = Ledger::spawn(SqliteStore::open(&db).unwrap()).unwrap();
    let second = Ledger::spawn(SqliteStore::open(&db).unwrap()).unwrap();

    let tasks: Vec<_> = (1..=100)
        .map(|n| {
            let ledger = if n % 2 == 0 { first.clone() } else { second.clone() };
            tokio::spawn(async move { ledger.append(entry(n)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let entries = first.list_all().await.unwrap();
    assert_eq!(entries.len(), 100);
    let unique: HashSet<i64> = search_ids(&entries).into_iter().collect();
    assert_eq!(unique, (1..=100).collect());
    assert_eq!(second.list_all().await.unwrap(), entries);
}

// ===== Corruption =====

#[tokio::test]
async fn test_corrupt_list_is_reported_not_replaced() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ledger.db");
    {
        let mut store = SqliteStore::open(&db).unwrap();
        store.set(UPLOADS_KEY, "{not a list").unwrap();
    }

    let ledger = Ledger::spawn(SqliteStore::open(&db).unwrap()).unwrap();
    let err = ledger.list_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let err = ledger.append(entry(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    drop(ledger);

    let store = SqliteStore::open(&db).unwrap();
    assert_eq!(store.get(UPLOADS_KEY).unwrap().as_deref(), Some("{not a list"));
}
