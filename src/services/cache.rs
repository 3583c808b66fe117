use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::models::MarketSnapshot;

/// Holds the most recent market snapshot until it expires.
pub struct SnapshotCache {
    entry: RwLock<Option<(Instant, Arc<MarketSnapshot>)>>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Cheap clone of the cached snapshot, if still fresh.
    pub fn get(&self) -> Option<Arc<MarketSnapshot>> {
        let entry = self.entry.read();
        match entry.as_ref() {
            Some((stored, snapshot)) if stored.elapsed() < self.ttl => Some(snapshot.clone()),
            _ => None,
        }
    }

    pub fn insert(&self, snapshot: MarketSnapshot) -> Arc<MarketSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.entry.write() = Some((Instant::now(), snapshot.clone()));
        snapshot
    }

    pub fn age(&self) -> Option<Duration> {
        self.entry.read().as_ref().map(|(stored, _)| stored.elapsed())
    }

    pub fn clear(&self) {
        if self.entry.write().take().is_some() {
            tracing::info!("🧹 Snapshot cache cleared");
        }
    }
}
