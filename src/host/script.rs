use std::io::BufRead;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::time::{self, Duration, Instant};

use super::ReplayStats;
use crate::detection::ScanEvent;
use crate::geometry::Size;
use crate::session::ScanController;

/// One line of a replay script: either a preview layout pass or a detection
/// event in the scanner's own shape. `atMs` paces the line relative to the
/// start of the replay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptLine {
    Layout {
        layout: Size,
        #[serde(rename = "atMs")]
        at_ms: Option<u64>,
    },
    Detection {
        #[serde(rename = "atMs")]
        at_ms: Option<u64>,
        #[serde(flatten)]
        event: ScanEvent,
    },
}

impl ScriptLine {
    pub fn at_ms(&self) -> Option<u64> {
        match self {
            ScriptLine::Layout { at_ms, .. } | ScriptLine::Detection { at_ms, .. } => *at_ms,
        }
    }
}

/// Parses JSON lines, skipping blanks and `#` comments.
pub fn parse_script(reader: impl BufRead) -> Result<Vec<ScriptLine>> {
    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read script line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed: ScriptLine = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid script line {}: {}", idx + 1, trimmed))?;
        lines.push(parsed);
    }
    Ok(lines)
}

/// Feeds the script into a running controller, sleeping until each line's
/// `atMs` when present.
pub async fn replay(controller: &ScanController, script: &[ScriptLine]) -> ReplayStats {
    let origin = Instant::now();
    let mut stats = ReplayStats::default();

    for line in script {
        if let Some(at_ms) = line.at_ms() {
            time::sleep_until(origin + Duration::from_millis(at_ms)).await;
        }

        match line {
            ScriptLine::Layout { layout, .. } => {
                controller.set_camera_layout(*layout).await;
                stats.layouts += 1;
            }
            ScriptLine::Detection { event, .. } => {
                stats.record(controller.ingest(event).await);
            }
        }
    }

    stats
}
