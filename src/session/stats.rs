//! Per-session traffic statistics
//!
//! One [`StreamStats`] instance is owned by each relay session and mutated
//! concurrently by both directional copy tasks. All fields are atomics with
//! relaxed ordering so the hot path stays lock-free; observers read through
//! the session registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Shared counters for one relay session
#[derive(Debug, Default)]
pub struct StreamStats {
    /// Bytes relayed local -> remote (upload)
    tx: AtomicU64,
    /// Bytes relayed remote -> local (download)
    rx: AtomicU64,
    /// Last activity, unix epoch milliseconds (0 = never active)
    last_active_ms: AtomicU64,
}

impl StreamStats {
    /// Create fresh statistics for a new session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add uploaded bytes (local -> remote)
    pub fn add_tx(&self, n: u64) {
        self.tx.fetch_add(n, Ordering::Relaxed);
    }

    /// Add downloaded bytes (remote -> local)
    pub fn add_rx(&self, n: u64) {
        self.rx.fetch_add(n, Ordering::Relaxed);
    }

    /// Refresh the last-activity timestamp to now
    pub fn touch(&self) {
        self.last_active_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Total uploaded bytes
    #[must_use]
    pub fn tx(&self) -> u64 {
        self.tx.load(Ordering::Relaxed)
    }

    /// Total downloaded bytes
    #[must_use]
    pub fn rx(&self) -> u64 {
        self.rx.load(Ordering::Relaxed)
    }

    /// Last activity in unix epoch milliseconds, 0 if never active
    #[must_use]
    pub fn last_active_ms(&self) -> u64 {
        self.last_active_ms.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot
    #[must_use]
    pub fn snapshot(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            tx: self.tx(),
            rx: self.rx(),
            last_active_ms: self.last_active_ms(),
        }
    }
}

/// Snapshot of session statistics at a point in time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamStatsSnapshot {
    /// Uploaded bytes
    pub tx: u64,
    /// Downloaded bytes
    pub rx: u64,
    /// Last activity, unix epoch milliseconds
    pub last_active_ms: u64,
}

impl StreamStatsSnapshot {
    /// Total bytes transferred in both directions
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.tx + self.rx
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
