pub mod cache;
pub mod event;
pub mod record;

pub use cache::{DetectionCache, IgnoreReason, IngestOutcome, DEFAULT_STALE_TIMEOUT};
pub use event::{EventBounds, ScanEvent};
pub use record::DetectionRecord;
