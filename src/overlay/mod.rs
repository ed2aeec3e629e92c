pub mod frame;
pub mod raster;

use serde::{Deserialize, Serialize};

pub use frame::{CounterBadge, OverlayBox, OverlayFrame};
pub use raster::{parse_hex_color, rasterize, write_png};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayStyle {
    pub stroke_color: String,
    pub stroke_width: u32,
    pub badge_color: String,
    pub badge_label: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke_color: "#00FF00".into(),
            stroke_width: 3,
            badge_color: "#00C853E6".into(),
            badge_label: "Unique".into(),
        }
    }
}
