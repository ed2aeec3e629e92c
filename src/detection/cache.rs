use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use super::record::DetectionRecord;
use crate::geometry::Rect;

pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingValue,
    EmptyValue,
    UnsupportedSymbology,
    /// No scan session is running; the screen is not active.
    SessionInactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First sighting of the value in the current active window.
    Inserted { first_ever: bool },
    /// Repeat sighting; geometry and last-seen time were refreshed.
    Updated,
    Ignored(IgnoreReason),
}

/// Active detections keyed by decoded value, plus the append-only set of
/// every value seen this session.
///
/// Repeats of a tracked value always update the record in place. Records
/// leave only through [`DetectionCache::sweep`] or [`DetectionCache::clear`].
#[derive(Debug)]
pub struct DetectionCache {
    records: Vec<DetectionRecord>,
    index: HashMap<String, usize>,
    seen: HashSet<String>,
    stale_timeout: Duration,
}

impl Default for DetectionCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIMEOUT)
    }
}

impl DetectionCache {
    pub fn new(stale_timeout: Duration) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            seen: HashSet::new(),
            stale_timeout,
        }
    }

    pub fn ingest(
        &mut self,
        value: &str,
        sensor_rect: Rect,
        screen_rect: Rect,
        now: Instant,
    ) -> IngestOutcome {
        if value.is_empty() {
            return IngestOutcome::Ignored(IgnoreReason::EmptyValue);
        }

        if let Some(&slot) = self.index.get(value) {
            self.records[slot].refresh(sensor_rect, screen_rect, now);
            return IngestOutcome::Updated;
        }

        let first_ever = self.seen.insert(value.to_string());
        self.index.insert(value.to_string(), self.records.len());
        self.records.push(DetectionRecord::new(
            value.to_string(),
            sensor_rect,
            screen_rect,
            now,
        ));

        IngestOutcome::Inserted { first_ever }
    }

    /// Drops every record idle for at least the stale timeout. Returns how
    /// many were removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.records.len();
        let timeout = self.stale_timeout;
        self.records.retain(|record| !record.is_stale(now, timeout));

        let removed = before - self.records.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Active records in insertion order.
    pub fn active_records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn get(&self, value: &str) -> Option<&DetectionRecord> {
        self.index.get(value).map(|&slot| &self.records[slot])
    }

    pub fn unique_count(&self) -> usize {
        self.seen.len()
    }

    /// Record with the latest sighting, ties going to the later insertion.
    pub fn most_recent(&self) -> Option<&DetectionRecord> {
        self.records.iter().max_by_key(|record| record.last_seen_at)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
        self.seen.clear();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (slot, record) in self.records.iter().enumerate() {
            self.index.insert(record.value.clone(), slot);
        }
    }
}
