use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use pio_lookup_tables::{CacheConfig, FileCache};

fn cache_in(directory: &TempDir, expiry: Duration) -> FileCache {
    FileCache::new(&CacheConfig::new(directory.path(), expiry))
}

#[tokio::test]
async fn values_round_trip_through_the_cache() {
    let directory = TempDir::new().unwrap();
    let cache = cache_in(&directory, Duration::from_secs(60));

    assert_eq!(cache.get::<Vec<String>>("missing").await, None);

    let value = vec!["a".to_string(), "b".to_string()];
    cache.put("list", &value).await.unwrap();
    assert_eq!(cache.get::<Vec<String>>("list").await, Some(value));
}

#[tokio::test]
async fn overwriting_a_key_replaces_the_entry() {
    let directory = TempDir::new().unwrap();
    let cache = cache_in(&directory, Duration::from_secs(60));

    cache.put("key", &1u32).await.unwrap();
    cache.put("key", &2u32).await.unwrap();
    assert_eq!(cache.get::<u32>("key").await, Some(2));
}

#[tokio::test]
async fn expired_entries_are_deleted_on_read() {
    let directory = TempDir::new().unwrap();
    let cache = cache_in(&directory, Duration::from_secs(60));

    // An entry written at the epoch is well past any expiry window.
    let stale = json!({"timestamp": 0, "data": "old"});
    let path = directory.path().join("stale.json");
    std::fs::write(&path, serde_json::to_vec(&stale).unwrap()).unwrap();

    assert_eq!(cache.get::<String>("stale").await, None);
    assert!(!path.exists());
}

#[tokio::test]
async fn unreadable_entries_fail_open_without_deletion() {
    let directory = TempDir::new().unwrap();
    let cache = cache_in(&directory, Duration::from_secs(60));

    let path = directory.path().join("garbled.json");
    std::fs::write(&path, b"not json").unwrap();

    assert_eq!(cache.get::<String>("garbled").await, None);
    assert!(path.exists());
}

#[tokio::test]
async fn entries_within_the_window_survive() {
    let directory = TempDir::new().unwrap();
    let cache = cache_in(&directory, Duration::from_secs(3600));

    cache.put("fresh", &"value".to_string()).await.unwrap();
    assert_eq!(
        cache.get::<String>("fresh").await,
        Some("value".to_string())
    );
    assert!(directory.path().join("fresh.json").exists());
}
