//! Scan counters exposed by a running watcher.
//!
//! Every finished, failed, or cancelled scan is recorded here together with the
//! notifications that triggered scans. Hosts poll [`ScanStatsCollector::snapshot`]
//! for diagnostics.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::warn;

const DEFAULT_SAMPLE_CAPACITY: usize = 128;

#[derive(Debug, Default)]
struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn percentile(&self, percentile: f32) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f32> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let rank = percentile.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
        sorted.get(rank.round() as usize).copied().unwrap_or(0.0)
    }
}

#[derive(Debug)]
struct StatsInner {
    started_at: Instant,
    scan_times_ms: SampleWindow,
    scans_completed: u64,
    scans_failed: u64,
    scans_cancelled: u64,
    notifications: u64,
    notifications_coalesced: u64,
    entries_added: u64,
    entries_removed: u64,
    last_entry_count: usize,
}

impl Default for StatsInner {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            scan_times_ms: SampleWindow::new(DEFAULT_SAMPLE_CAPACITY),
            scans_completed: 0,
            scans_failed: 0,
            scans_cancelled: 0,
            notifications: 0,
            notifications_coalesced: 0,
            entries_added: 0,
            entries_removed: 0,
            last_entry_count: 0,
        }
    }
}

/// Thread-safe scan counters shared between the watcher and its worker.
#[derive(Debug, Default)]
pub struct ScanStatsCollector {
    inner: parking_lot::Mutex<StatsInner>,
}

impl ScanStatsCollector {
    /// Empty counters; uptime starts now.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed scan.
    pub fn record_scan(&self, duration: Duration, added: usize, removed: usize, entry_count: usize) {
        let mut guard = self.inner.lock();
        guard.scan_times_ms.push(duration.as_secs_f64() as f32 * 1_000.0);
        guard.scans_completed = guard.scans_completed.saturating_add(1);
        guard.entries_added = guard.entries_added.saturating_add(added as u64);
        guard.entries_removed = guard.entries_removed.saturating_add(removed as u64);
        guard.last_entry_count = entry_count;
    }

    /// Record a scan that aborted on an error and committed nothing.
    pub fn record_failed(&self) {
        let mut guard = self.inner.lock();
        guard.scans_failed = guard.scans_failed.saturating_add(1);
    }

    /// Record a scan stopped by cancellation. Not counted as a failure.
    pub fn record_cancelled(&self) {
        let mut guard = self.inner.lock();
        guard.scans_cancelled = guard.scans_cancelled.saturating_add(1);
    }

    /// Record a change notification; `coalesced` when it was folded into an already queued scan.
    pub fn record_notification(&self, coalesced: bool) {
        let mut guard = self.inner.lock();
        guard.notifications = guard.notifications.saturating_add(1);
        if coalesced {
            guard.notifications_coalesced = guard.notifications_coalesced.saturating_add(1);
        }
    }

    /// Copy the counters and the current p50/p95 scan times.
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        let guard = self.inner.lock();
        ScanStatsSnapshot {
            timestamp_ms: now_ms(),
            uptime_ms: guard.started_at.elapsed().as_millis() as u64,
            scans_completed: guard.scans_completed,
            scans_failed: guard.scans_failed,
            scans_cancelled: guard.scans_cancelled,
            notifications: guard.notifications,
            notifications_coalesced: guard.notifications_coalesced,
            entries_added: guard.entries_added,
            entries_removed: guard.entries_removed,
            entry_count: guard.last_entry_count,
            scan_time_ms_p50: guard.scan_times_ms.percentile(0.50),
            scan_time_ms_p95: guard.scan_times_ms.percentile(0.95),
        }
    }
}

fn now_ms() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(delta) => delta.as_millis() as u64,
        Err(err) => {
            warn!("system clock error: {err}");
            0
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatsSnapshot {
    pub timestamp_ms: u64,
    pub uptime_ms: u64,
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub scans_cancelled: u64,
    pub notifications: u64,
    pub notifications_coalesced: u64,
    pub entries_added: u64,
    pub entries_removed: u64,
    pub entry_count: usize,
    pub scan_time_ms_p50: f32,
    pub scan_time_ms_p95: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_and_percentiles_are_tracked() {
        let collector = ScanStatsCollector::new();
        collector.record_scan(Duration::from_millis(10), 3, 0, 3);
        collector.record_scan(Duration::from_millis(20), 1, 2, 2);
        collector.record_scan(Duration::from_millis(30), 0, 0, 2);
        collector.record_failed();
        collector.record_cancelled();

        let snap = collector.snapshot();
        assert_eq!(snap.scans_completed, 3);
        assert_eq!(snap.scans_failed, 1);
        assert_eq!(snap.scans_cancelled, 1);
        assert_eq!(snap.entries_added, 4);
        assert_eq!(snap.entries_removed, 2);
        assert_eq!(snap.entry_count, 2);
        assert!(snap.scan_time_ms_p50 >= 19.0 && snap.scan_time_ms_p50 <= 21.0);
        assert!(snap.scan_time_ms_p95 >= snap.scan_time_ms_p50);
    }

    #[test]
    fn coalesced_notifications_are_counted() {
        let collector = ScanStatsCollector::new();
        collector.record_notification(false);
        collector.record_notification(true);
        collector.record_notification(true);

        let snap = collector.snapshot();
        assert_eq!(snap.notifications, 3);
        assert_eq!(snap.notifications_coalesced, 2);
    }

    #[test]
    fn snapshot_serialises() {
        let snap = ScanStatsCollector::new().snapshot();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["scans_completed"], 0);
        assert_eq!(json["scan_time_ms_p95"], 0.0);
    }
}
