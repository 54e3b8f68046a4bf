//! Per-station mutation locks

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutexes, one per station id. Entries are created on first use
/// and kept for the lifetime of the engine; the station set is small and fixed.
#[derive(Default)]
pub struct StationLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        // The DashMap shard guard is released before awaiting.
        let mutex = self.entry(key);
        mutex.lock_owned().await
    }

    /// Lock several stations in sorted order. Duplicates are locked once.
    pub async fn lock_many(&self, keys: &[&str]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<&str> = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.lock(key).await);
        }
        guards
    }
}
