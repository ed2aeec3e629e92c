pub mod controller;
pub mod state;
pub mod sweep;

pub use controller::ScanController;
pub use state::{OverlaySnapshot, ScanSession, ScanStatus, TrackedCode};
