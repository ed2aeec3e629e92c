use serde::Serialize;

use super::OverlayStyle;
use crate::geometry::{Rect, Size};
use crate::session::OverlaySnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayBox {
    pub value: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterBadge {
    pub count: usize,
    pub label: String,
}

/// Everything drawn over the camera preview for one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayFrame {
    pub screen: Size,
    pub boxes: Vec<OverlayBox>,
    pub counter: CounterBadge,
    /// Top-left debug readout: camera and screen sizes, and their ratio
    /// once the preview is measured.
    pub debug_lines: Vec<String>,
    /// Bottom info box describing the most recent code; empty when nothing
    /// is on screen.
    pub info_lines: Vec<String>,
}

impl OverlayFrame {
    pub fn from_snapshot(snapshot: &OverlaySnapshot, style: &OverlayStyle) -> Self {
        let boxes = snapshot
            .codes
            .iter()
            .map(|code| OverlayBox {
                value: code.value.clone(),
                rect: code.screen_rect,
            })
            .collect();

        Self {
            screen: snapshot.screen,
            boxes,
            counter: CounterBadge {
                count: snapshot.unique_count,
                label: style.badge_label.clone(),
            },
            debug_lines: debug_lines(snapshot.camera_layout, snapshot.screen),
            info_lines: info_lines(snapshot),
        }
    }
}

fn debug_lines(camera: Size, screen: Size) -> Vec<String> {
    let mut lines = vec![
        format!("Camera: {:.0} x {:.0}", camera.width, camera.height),
        format!("Screen: {} x {}", screen.width, screen.height),
    ];
    if camera.is_measured() {
        lines.push(format!("Ratio X: {:.3}", screen.width / camera.width));
        lines.push(format!("Ratio Y: {:.3}", screen.height / camera.height));
    }
    lines
}

fn info_lines(snapshot: &OverlaySnapshot) -> Vec<String> {
    let Some(code) = snapshot.latest_code() else {
        return Vec::new();
    };
    let screen = code.screen_rect;
    let raw = code.sensor_rect;

    vec![
        format!("Value: {}", code.value),
        format!("TRANSFORMED - X: {}, Y: {}", screen.x.round(), screen.y.round()),
        format!(
            "TRANSFORMED - W: {}, H: {}",
            screen.width.round(),
            screen.height.round()
        ),
        format!("RAW - X: {}, Y: {}", raw.x.round(), raw.y.round()),
        format!("RAW - W: {}, H: {}", raw.width.round(), raw.height.round()),
    ]
}
