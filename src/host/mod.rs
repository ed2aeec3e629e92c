//! Stand-ins for the platform side of the scanning screen: a JSON-lines
//! replay of recorded scanner callbacks and a synthetic scanner.

pub mod script;
pub mod simulate;

use serde::Serialize;

use crate::detection::IngestOutcome;

pub use script::{parse_script, replay, ScriptLine};
pub use simulate::{simulate, SimulatedScanner};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub layouts: usize,
    pub inserted: usize,
    pub updated: usize,
    pub ignored: usize,
}

impl ReplayStats {
    pub fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Inserted { .. } => self.inserted += 1,
            IngestOutcome::Updated => self.updated += 1,
            IngestOutcome::Ignored(_) => self.ignored += 1,
        }
    }
}
