use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::{DetectionCache, DetectionRecord, IgnoreReason, IngestOutcome, ScanEvent};
use crate::geometry::{Rect, Size};
use crate::mapper::{map_to_screen, DEFAULT_SCREEN_RECT};
use crate::settings::{symbology_allowed, ScannerSettings};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanStatus {
    #[default]
    Idle,
    Scanning,
}

/// Everything the scanning screen mutates while it is mounted: the
/// detection cache, the unique-value set inside it, and the latest preview
/// measurement.
#[derive(Debug)]
pub struct ScanSession {
    status: ScanStatus,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    camera_layout: Size,
    screen: Size,
    cache: DetectionCache,
    accepted_types: Vec<String>,
    trace_geometry: bool,
}

impl ScanSession {
    pub fn new(settings: &ScannerSettings) -> Self {
        Self {
            status: ScanStatus::Idle,
            session_id: None,
            started_at: None,
            camera_layout: Size::default(),
            screen: settings.screen,
            cache: DetectionCache::new(settings.stale_timeout()),
            accepted_types: settings.barcode_types.clone(),
            trace_geometry: false,
        }
    }

    pub fn with_geometry_trace(mut self, enabled: bool) -> Self {
        self.trace_geometry = enabled;
        self
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn camera_layout(&self) -> Size {
        self.camera_layout
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    /// Starts a fresh session. Detections from any earlier session are gone;
    /// a preview measurement taken before the start is kept.
    pub fn begin(&mut self, session_id: String, started_at: DateTime<Utc>) {
        self.cache.clear();
        self.status = ScanStatus::Scanning;
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
    }

    /// Tears the session down entirely, layout included.
    pub fn end(&mut self) {
        self.cache.clear();
        self.status = ScanStatus::Idle;
        self.session_id = None;
        self.started_at = None;
        self.camera_layout = Size::default();
    }

    pub fn set_camera_layout(&mut self, layout: Size) {
        self.camera_layout = layout;
    }

    /// Maps the sensor geometry into overlay space and upserts the record
    /// for `value`. Absent geometry degrades to the default rectangle.
    pub fn ingest(&mut self, value: &str, sensor_rect: Option<Rect>, now: Instant) -> IngestOutcome {
        let (sensor, screen) = match sensor_rect {
            Some(sensor) => (sensor, map_to_screen(&sensor, self.camera_layout, self.screen)),
            None => (Rect::default(), DEFAULT_SCREEN_RECT),
        };

        if self.trace_geometry {
            log_debug!(
                "x={:.1}, y={:.1}, width={:.1}, height={:.1}, camWidth={:.1}, camHeight={:.1}, screenWidth={}, screenHeight={} | raw=({:.1}, {:.1}, {:.1}, {:.1}) value={}",
                screen.x,
                screen.y,
                screen.width,
                screen.height,
                self.camera_layout.width,
                self.camera_layout.height,
                self.screen.width,
                self.screen.height,
                sensor.x,
                sensor.y,
                sensor.width,
                sensor.height,
                value
            );
        }

        self.cache.ingest(value, sensor, screen, now)
    }

    /// Validates a raw scanner event and feeds it to [`ScanSession::ingest`].
    pub fn ingest_event(&mut self, event: &ScanEvent, now: Instant) -> IngestOutcome {
        let outcome = match event.data.as_deref() {
            None => IngestOutcome::Ignored(IgnoreReason::MissingValue),
            Some("") => IngestOutcome::Ignored(IgnoreReason::EmptyValue),
            Some(_) if !self.accepts(event.symbology.as_deref()) => {
                IngestOutcome::Ignored(IgnoreReason::UnsupportedSymbology)
            }
            Some(value) => self.ingest(value, event.sensor_rect(), now),
        };

        if let IngestOutcome::Ignored(reason) = outcome {
            log_warn!(
                "Ignoring detection ({:?}) type={:?}",
                reason,
                event.symbology
            );
        }
        outcome
    }

    pub fn sweep(&mut self, now: Instant) -> usize {
        self.cache.sweep(now)
    }

    pub fn active_records(&self) -> &[DetectionRecord] {
        self.cache.active_records()
    }

    pub fn unique_count(&self) -> usize {
        self.cache.unique_count()
    }

    pub fn snapshot(&self, now: Instant) -> OverlaySnapshot {
        let codes = self
            .cache
            .active_records()
            .iter()
            .map(|record| TrackedCode::from_record(record, now))
            .collect();

        OverlaySnapshot {
            session_id: self.session_id.clone(),
            status: self.status,
            started_at: self.started_at,
            camera_layout: self.camera_layout,
            screen: self.screen,
            unique_count: self.cache.unique_count(),
            codes,
            latest: self.cache.most_recent().map(|record| record.value.clone()),
        }
    }

    fn accepts(&self, symbology: Option<&str>) -> bool {
        symbology_allowed(&self.accepted_types, symbology)
    }
}

/// What the rendering layer reads on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySnapshot {
    pub session_id: Option<String>,
    pub status: ScanStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub camera_layout: Size,
    pub screen: Size,
    pub unique_count: usize,
    pub codes: Vec<TrackedCode>,
    /// Value of the most recently sighted code, shown in the info box.
    pub latest: Option<String>,
}

impl OverlaySnapshot {
    pub fn latest_code(&self) -> Option<&TrackedCode> {
        let latest = self.latest.as_deref()?;
        self.codes.iter().find(|code| code.value == latest)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedCode {
    pub value: String,
    pub screen_rect: Rect,
    pub sensor_rect: Rect,
    pub detected_at: DateTime<Utc>,
    pub tracked_ms: u64,
    pub idle_ms: u64,
    pub hits: u32,
}

impl TrackedCode {
    fn from_record(record: &DetectionRecord, now: Instant) -> Self {
        Self {
            value: record.value.clone(),
            screen_rect: record.screen_rect,
            sensor_rect: record.sensor_rect,
            detected_at: record.detected_at,
            tracked_ms: record.tracked_for().as_millis() as u64,
            idle_ms: record.idle_for(now).as_millis() as u64,
            hits: record.hits,
        }
    }
}
