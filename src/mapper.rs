//! Sensor-space to overlay-space transform.
//!
//! The back camera reports geometry in a frame rotated 90° from the upright
//! portrait preview. The transform below was measured on that mounting; it
//! assumes the camera preview and the display share an aspect ratio and
//! applies no scale factor between them.

use crate::geometry::{Point, Rect, Size};

/// Returned until the camera preview has been laid out, and for detections
/// without any geometry.
pub const DEFAULT_SCREEN_RECT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 100.0,
    height: 100.0,
};

/// Stand-in for a width or height the scanner did not report.
pub const DEFAULT_SENSOR_EXTENT: f64 = 100.0;

/// Zero (unreported) sensor extents are mapped as `DEFAULT_SENSOR_EXTENT`.
/// The raw sensor rect itself keeps the zero.
pub fn map_to_screen(sensor: &Rect, camera_viewport: Size, screen_viewport: Size) -> Rect {
    if !camera_viewport.is_measured() {
        return DEFAULT_SCREEN_RECT;
    }

    let width = extent_or_default(sensor.width);
    let height = extent_or_default(sensor.height);
    Rect {
        x: screen_viewport.width - sensor.y + height,
        y: sensor.x,
        width: height,
        height: width,
    }
}

fn extent_or_default(value: f64) -> f64 {
    if value == 0.0 || value.is_nan() {
        DEFAULT_SENSOR_EXTENT
    } else {
        value
    }
}

/// Axis-aligned box enclosing the corner points of a detection.
pub fn bounds_from_corner_points(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);

    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}
