use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};
use crate::mapper::bounds_from_corner_points;

/// Detection payload as delivered by the platform scanning library, one per
/// recognized symbol per frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub data: Option<String>,
    #[serde(rename = "type")]
    pub symbology: Option<String>,
    pub bounds: Option<EventBounds>,
    pub corner_points: Option<Vec<Point>>,
}

/// Bounds as reported by the scanner. Either half may be missing on some
/// platforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBounds {
    pub origin: Option<Point>,
    pub size: Option<Size>,
}

impl EventBounds {
    /// Raw sensor rect. Anything missing reads as 0; the mapper substitutes
    /// its default extent when projecting onto the screen.
    pub fn to_rect(&self) -> Rect {
        let origin = self.origin.unwrap_or_default();
        let size = self.size.unwrap_or_default();
        Rect::new(
            raw_or_zero(origin.x),
            raw_or_zero(origin.y),
            raw_or_zero(size.width),
            raw_or_zero(size.height),
        )
    }
}

fn raw_or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

impl ScanEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn with_bounds(mut self, rect: Rect) -> Self {
        self.bounds = Some(EventBounds {
            origin: Some(rect.origin()),
            size: Some(rect.size()),
        });
        self
    }

    pub fn with_corner_points(mut self, points: Vec<Point>) -> Self {
        self.corner_points = Some(points);
        self
    }

    /// Sensor-space geometry of the detection. Explicit bounds win; corner
    /// points are the fallback when the scanner omits bounds.
    pub fn sensor_rect(&self) -> Option<Rect> {
        if let Some(bounds) = &self.bounds {
            return Some(bounds.to_rect());
        }
        self.corner_points
            .as_deref()
            .and_then(bounds_from_corner_points)
    }
}
