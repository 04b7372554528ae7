//! 数据存储集成测试
//!
//! 覆盖快照读写回环、缓存失效与消费路径的关键性质

use std::sync::Arc;

use tempfile::TempDir;

use coze_invite::models::invite_code::{
    DataSnapshot, InviteCode, STATUS_ACTIVATED, STATUS_UNUSED,
};
use coze_invite::services::DataStore;

fn store_in(dir: &TempDir) -> DataStore {
    DataStore::new(dir.path().join("data.json"))
}

fn snapshot_with(codes: Vec<InviteCode>) -> DataSnapshot {
    DataSnapshot {
        codes,
        last_update: Some("2026-08-26T10:00:00+00:00".to_string()),
        next_update: Some(1_787_000_000_000),
    }
}

#[tokio::test]
async fn test_save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let snapshot = snapshot_with(vec![
        InviteCode::new("ABC123", STATUS_UNUSED).with_source("账号1"),
        InviteCode::new("DEF456", STATUS_ACTIVATED).with_source("账号2"),
    ]);

    store.save(&snapshot).await.unwrap();
    let loaded = store.load().await;

    assert_eq!(loaded, snapshot);
}

#[tokio::test]
async fn test_load_missing_file_returns_empty_default() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let loaded = store.load().await;

    assert!(loaded.codes.is_empty());
    assert_eq!(loaded.last_update, None);
    assert_eq!(loaded.next_update, None);
}

#[tokio::test]
async fn test_load_corrupted_file_degrades_to_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, "{not valid json").unwrap();

    let store = DataStore::new(path);
    let loaded = store.load().await;

    assert_eq!(loaded, DataSnapshot::default());
}

#[tokio::test]
async fn test_save_invalidates_cache() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let first = snapshot_with(vec![InviteCode::new("AAA111", STATUS_UNUSED)]);
    store.save(&first).await.unwrap();
    // 预热缓存
    assert_eq!(store.load().await, first);

    let second = snapshot_with(vec![InviteCode::new("BBB222", STATUS_UNUSED)]);
    store.save(&second).await.unwrap();

    // 写后不允许观察到旧值
    assert_eq!(store.load().await, second);
}

#[tokio::test]
async fn test_consume_activates_first_unused_and_persists() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let snapshot = snapshot_with(vec![
        InviteCode::new("ABC123", STATUS_UNUSED).with_source("账号1")
    ]);
    store.save(&snapshot).await.unwrap();

    let consumed = store.consume_unused_code().await.unwrap().unwrap();
    assert_eq!(consumed.code, "ABC123");
    assert_eq!(consumed.status, STATUS_ACTIVATED);
    assert_eq!(consumed.source, "账号1");

    // 用全新的store实例重读磁盘,确认持久化结果
    let reread = store_in(&dir).load().await;
    assert_eq!(reread.codes[0].status, STATUS_ACTIVATED);
}

#[tokio::test]
async fn test_consume_without_unused_returns_none() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let snapshot = snapshot_with(vec![
        InviteCode::new("ABC123", STATUS_ACTIVATED).with_source("账号1")
    ]);
    store.save(&snapshot).await.unwrap();

    assert!(store.consume_unused_code().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sequential_consumes_hand_out_distinct_codes() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let snapshot = snapshot_with(vec![
        InviteCode::new("AAA111", STATUS_UNUSED),
        InviteCode::new("BBB222", STATUS_UNUSED),
    ]);
    store.save(&snapshot).await.unwrap();

    let first = store.consume_unused_code().await.unwrap().unwrap();
    let second = store.consume_unused_code().await.unwrap().unwrap();
    let third = store.consume_unused_code().await.unwrap();

    assert_eq!(first.code, "AAA111");
    assert_eq!(second.code, "BBB222");
    assert!(third.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumes_never_double_activate() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(store_in(&dir));

    let snapshot = snapshot_with(vec![InviteCode::new("ONLY01", STATUS_UNUSED)]);
    store.save(&snapshot).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(
            async move { store.consume_unused_code().await },
        ));
    }

    let mut hits = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            hits += 1;
        }
    }

    // 唯一的未激活条目只能被发放一次
    assert_eq!(hits, 1);
}
