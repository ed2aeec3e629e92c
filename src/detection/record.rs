use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::geometry::Rect;

/// One distinct decoded value that is currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub value: String,
    pub screen_rect: Rect,
    /// Geometry as the scanner reported it, kept for the debug readout.
    pub sensor_rect: Rect,
    pub first_seen_at: Instant,
    pub last_seen_at: Instant,
    pub detected_at: DateTime<Utc>,
    pub hits: u32,
}

impl DetectionRecord {
    pub fn new(value: String, sensor_rect: Rect, screen_rect: Rect, now: Instant) -> Self {
        Self {
            value,
            screen_rect,
            sensor_rect,
            first_seen_at: now,
            last_seen_at: now,
            detected_at: Utc::now(),
            hits: 1,
        }
    }

    /// Folds a repeat detection into this record. `now` earlier than the last
    /// sighting is clamped so `last_seen_at` never moves backwards.
    pub fn refresh(&mut self, sensor_rect: Rect, screen_rect: Rect, now: Instant) {
        self.sensor_rect = sensor_rect;
        self.screen_rect = screen_rect;
        self.last_seen_at = self.last_seen_at.max(now);
        self.hits = self.hits.saturating_add(1);
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen_at)
    }

    pub fn is_stale(&self, now: Instant, stale_timeout: Duration) -> bool {
        self.idle_for(now) >= stale_timeout
    }

    pub fn tracked_for(&self) -> Duration {
        self.last_seen_at.duration_since(self.first_seen_at)
    }
}
