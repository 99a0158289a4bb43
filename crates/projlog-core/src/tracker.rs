//! Per-document open/sync bookkeeping
//!
//! Entries are keyed by [`DocumentId`] handle identity. An entry is created on
//! the first open (or on a sync without an observed open) and removed on
//! close, so the map never outlives the documents it describes.

use crate::host::DocumentId;
use chrono::{DateTime, Local};
use dashmap::DashMap;
use tracing::debug;

/// State kept for one live document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingEntry {
    pub opened_at: DateTime<Local>,
    pub sync_count: u32,
}

/// Values handed to the collector when a document closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub opened_at: DateTime<Local>,
    pub sync_count: u32,
    /// False when the close arrived for an untracked document
    pub was_tracked: bool,
}

/// Identity-keyed registry of open documents
#[derive(Debug, Default)]
pub struct DocumentTracker {
    entries: DashMap<DocumentId, TrackingEntry>,
}

impl DocumentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `id`. Repeated opens keep the first timestamp.
    ///
    /// Returns true if a new entry was created.
    pub fn record_open(&self, id: DocumentId, now: DateTime<Local>) -> bool {
        let mut inserted = false;
        self.entries.entry(id).or_insert_with(|| {
            inserted = true;
            TrackingEntry {
                opened_at: now,
                sync_count: 0,
            }
        });
        debug!(document = %id, inserted, "Document opened");
        inserted
    }

    /// Count one synchronization, creating the entry if none exists.
    ///
    /// Returns the new count.
    pub fn record_sync(&self, id: DocumentId, now: DateTime<Local>) -> u32 {
        let mut entry = self.entries.entry(id).or_insert(TrackingEntry {
            opened_at: now,
            sync_count: 0,
        });
        entry.sync_count = entry.sync_count.saturating_add(1);
        let count = entry.sync_count;
        debug!(document = %id, sync_count = count, "Document synchronized");
        count
    }

    /// Remove the entry for `id` and return what was known about it.
    ///
    /// Untracked documents fall back to `now` and zero syncs.
    pub fn consume_on_close(&self, id: DocumentId, now: DateTime<Local>) -> TrackerSnapshot {
        match self.entries.remove(&id) {
            Some((_, entry)) => TrackerSnapshot {
                opened_at: entry.opened_at,
                sync_count: entry.sync_count,
                was_tracked: true,
            },
            None => TrackerSnapshot {
                opened_at: now,
                sync_count: 0,
                was_tracked: false,
            },
        }
    }

    pub fn get(&self, id: DocumentId) -> Option<TrackingEntry> {
        self.entries.get(&id).map(|entry| *entry)
    }

    pub fn is_tracking(&self, id: DocumentId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry (plugin unload).
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_open_is_idempotent() {
        let tracker = DocumentTracker::new();
        let id = DocumentId::new(1);

        assert!(tracker.record_open(id, t0()));
        assert!(!tracker.record_open(id, t0() + Duration::seconds(60)));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get(id).unwrap().opened_at, t0());
    }

    #[test]
    fn test_sync_counts_and_close_consumes() {
        let tracker = DocumentTracker::new();
        let id = DocumentId::new(7);

        tracker.record_open(id, t0());
        assert_eq!(tracker.record_sync(id, t0() + Duration::seconds(10)), 1);
        assert_eq!(tracker.record_sync(id, t0() + Duration::seconds(20)), 2);

        let snapshot = tracker.consume_on_close(id, t0() + Duration::seconds(630));
        assert_eq!(
            snapshot,
            TrackerSnapshot {
                opened_at: t0(),
                sync_count: 2,
                was_tracked: true,
            }
        );
        assert!(!tracker.is_tracking(id));
    }

    #[test]
    fn test_sync_without_open_creates_entry() {
        let tracker = DocumentTracker::new();
        let id = DocumentId::new(3);
        let at = t0() + Duration::seconds(5);

        assert_eq!(tracker.record_sync(id, at), 1);
        let entry = tracker.get(id).unwrap();
        assert_eq!(entry.opened_at, at);
        assert_eq!(entry.sync_count, 1);
    }

    #[test]
    fn test_close_untracked_falls_back_to_now() {
        let tracker = DocumentTracker::new();
        let now = t0();

        let snapshot = tracker.consume_on_close(DocumentId::new(99), now);
        assert_eq!(snapshot.opened_at, now);
        assert_eq!(snapshot.sync_count, 0);
        assert!(!snapshot.was_tracked);
    }

    #[test]
    fn test_second_close_is_untracked() {
        let tracker = DocumentTracker::new();
        let id = DocumentId::new(5);
        tracker.record_open(id, t0());
        tracker.record_sync(id, t0());

        assert!(tracker.consume_on_close(id, t0()).was_tracked);
        let again = tracker.consume_on_close(id, t0() + Duration::seconds(1));
        assert!(!again.was_tracked);
        assert_eq!(again.sync_count, 0);
    }

    #[test]
    fn test_distinct_ids_are_tracked_independently() {
        let tracker = DocumentTracker::new();
        let a = DocumentId::new(1);
        let b = DocumentId::new(2);

        tracker.record_open(a, t0());
        tracker.record_open(b, t0() + Duration::seconds(30));
        tracker.record_sync(a, t0());
        tracker.record_sync(a, t0());
        tracker.record_sync(b, t0());

        let closed_b = tracker.consume_on_close(b, t0() + Duration::seconds(90));
        assert_eq!(closed_b.sync_count, 1);
        assert_eq!(closed_b.opened_at, t0() + Duration::seconds(30));
        assert_eq!(tracker.get(a).unwrap().sync_count, 2);
    }

    #[test]
    fn test_clear_drops_everything() {
        let tracker = DocumentTracker::new();
        tracker.record_open(DocumentId::new(1), t0());
        tracker.record_open(DocumentId::new(2), t0());

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
