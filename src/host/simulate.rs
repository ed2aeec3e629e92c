use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::{self, Duration, Instant};

use super::ReplayStats;
use crate::detection::ScanEvent;
use crate::geometry::{Rect, Size};
use crate::session::ScanController;

/// Chance that a visible code is missed in a given frame.
const MISS_RATE: f64 = 0.1;
const JITTER: f64 = 2.0;

#[derive(Debug, Clone)]
struct SimulatedCode {
    value: String,
    visible_from_ms: u64,
    visible_until_ms: u64,
    base: Rect,
}

/// Synthetic scanner: a fixed set of codes, each in view for a random
/// window, reported every frame with a little positional jitter and the
/// occasional missed read.
pub struct SimulatedScanner {
    rng: StdRng,
    codes: Vec<SimulatedCode>,
}

impl SimulatedScanner {
    pub fn new(seed: u64, count: usize, duration_ms: u64, sensor: Size) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let span = duration_ms.max(1);
        let max_x = (sensor.width - 120.0).max(1.0);
        let max_y = (sensor.height - 120.0).max(1.0);

        let codes = (0..count)
            .map(|idx| {
                let start = rng.gen_range(0..span);
                let visible = rng.gen_range(300..=span.max(301));
                let side = rng.gen_range(60.0..120.0);
                SimulatedCode {
                    value: format!("010{:013}", rng.gen_range(0..10_000_000_000_000u64) + idx as u64),
                    visible_from_ms: start,
                    visible_until_ms: start.saturating_add(visible).min(span),
                    base: Rect::new(
                        rng.gen_range(0.0..max_x),
                        rng.gen_range(0.0..max_y),
                        side,
                        side,
                    ),
                }
            })
            .collect();

        Self { rng, codes }
    }

    /// Detections reported for the frame captured `at_ms` into the run.
    pub fn frame(&mut self, at_ms: u64) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        for code in &self.codes {
            if at_ms < code.visible_from_ms || at_ms >= code.visible_until_ms {
                continue;
            }
            if self.rng.gen_bool(MISS_RATE) {
                continue;
            }
            let rect = Rect::new(
                code.base.x + self.rng.gen_range(-JITTER..JITTER),
                code.base.y + self.rng.gen_range(-JITTER..JITTER),
                code.base.width,
                code.base.height,
            );
            let mut event = ScanEvent::new(code.value.clone()).with_bounds(rect);
            event.symbology = Some("datamatrix".into());
            events.push(event);
        }
        events
    }
}

/// Runs the scanner against a started controller at a fixed frame rate.
pub async fn simulate(
    controller: &ScanController,
    scanner: &mut SimulatedScanner,
    duration_ms: u64,
    frame_interval: Duration,
) -> ReplayStats {
    let origin = Instant::now();
    let mut ticker = time::interval(frame_interval);
    let mut stats = ReplayStats::default();

    loop {
        ticker.tick().await;
        let at_ms = origin.elapsed().as_millis() as u64;
        if at_ms >= duration_ms {
            break;
        }
        for event in scanner.frame(at_ms) {
            stats.record(controller.ingest(&event).await);
        }
    }

    stats
}
