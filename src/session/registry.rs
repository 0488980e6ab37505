//! Active-session registry
//!
//! Tracks the [`StreamStats`] of every live session so external monitoring
//! can observe per-session traffic and recency without touching the relay
//! hot path. Sessions register when their remote stream opens and unregister
//! when the relay returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::hooks::SessionId;
use super::stats::{StreamStats, StreamStatsSnapshot};

/// Concurrent table of live sessions and their statistics
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: DashMap<SessionId, Arc<StreamStats>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and register fresh statistics for a new session
    pub fn register(&self) -> (SessionId, Arc<StreamStats>) {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stats = Arc::new(StreamStats::new());
        self.sessions.insert(id, stats.clone());
        (id, stats)
    }

    /// Remove a finished session
    pub fn unregister(&self, id: SessionId) {
        self.sessions.remove(&id);
    }

    /// Statistics of one live session, if still active
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<Arc<StreamStats>> {
        self.sessions.get(&id).map(|entry| entry.clone())
    }

    /// Number of live sessions
    #[must_use]
    pub fn active(&self) -> usize {
        self.sessions.len()
    }

    /// Point-in-time snapshot of all live sessions
    #[must_use]
    pub fn snapshots(&self) -> Vec<(SessionId, StreamStatsSnapshot)> {
        self.sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().snapshot()))
            .collect()
    }
}
