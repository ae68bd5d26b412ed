//! Time-ordered series of FX rate snapshots.
//!
//! Snapshots are kept sorted by timestamp with no duplicates, so the
//! at-or-before lookup is a binary search.

use crate::models::fx::RateSnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotSeries {
    snapshots: Vec<RateSnapshot>,
}

impl SnapshotSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from snapshots in any order. Later duplicates of a
    /// timestamp are dropped.
    pub fn from_snapshots(snapshots: Vec<RateSnapshot>) -> Self {
        let mut series = Self::new();
        for snapshot in snapshots {
            series.append(snapshot);
        }
        series
    }

    /// Insert a snapshot unless one with the same timestamp exists.
    ///
    /// Returns false when the insert was a no-op.
    pub fn append(&mut self, snapshot: RateSnapshot) -> bool {
        match self
            .snapshots
            .binary_search_by_key(&snapshot.timestamp, |s| s.timestamp)
        {
            Ok(_) => false,
            Err(pos) => {
                self.snapshots.insert(pos, snapshot);
                true
            }
        }
    }

    /// Drop every snapshot older than `now_ms - retention_ms`.
    ///
    /// Returns the number of snapshots removed.
    pub fn prune(&mut self, now_ms: i64, retention_ms: i64) -> usize {
        let cutoff = now_ms.saturating_sub(retention_ms);
        let keep_from = self.snapshots.partition_point(|s| s.timestamp < cutoff);
        self.snapshots.drain(..keep_from);
        keep_from
    }

    pub fn find_at_or_before(&self, target_ms: i64) -> Option<&RateSnapshot> {
        find_at_or_before(&self.snapshots, target_ms)
    }

    pub fn latest(&self) -> Option<&RateSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn as_slice(&self) -> &[RateSnapshot] {
        &self.snapshots
    }

    pub fn into_inner(self) -> Vec<RateSnapshot> {
        self.snapshots
    }
}

/// Latest snapshot with `timestamp <= target_ms` in a timestamp-sorted slice.
pub fn find_at_or_before(sorted: &[RateSnapshot], target_ms: i64) -> Option<&RateSnapshot> {
    let idx = sorted.partition_point(|s| s.timestamp <= target_ms);
    if idx == 0 { None } else { sorted.get(idx - 1) }
}
