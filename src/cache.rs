use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::Result;

/// Time-expiring, file-backed memoization store.
///
/// Every network-derived artifact of the pipeline is keyed here so repeated
/// runs do not hammer the remote terminology services. One JSON file per key,
/// each holding the creation timestamp next to the payload. Reads fail open:
/// a missing file, a parse error, or an expired entry all come back as `None`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    expiry: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    timestamp: i64,
    data: T,
}

impl FileCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            root: config.root.clone(),
            expiry: config.expiry,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Read a cached value. Expired entries are deleted as a side effect.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).await.ok()?;
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Discarding unreadable cache entry {key}: {err}");
                return None;
            }
        };
        if entry.timestamp + self.expiry.as_secs() as i64 > chrono::Utc::now().timestamp() {
            Some(entry.data)
        } else {
            debug!("Cache entry {key} expired, deleting");
            fs::remove_file(&path).await.ok();
            None
        }
    }

    /// Store a value under `key`, overwriting any existing entry.
    pub async fn put<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let entry = CacheEntry {
            timestamp: chrono::Utc::now().timestamp(),
            data,
        };
        fs::write(&path, serde_json::to_vec(&entry)?).await?;
        Ok(())
    }
}
