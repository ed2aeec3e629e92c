//! Logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! The scan path runs for every camera frame, so modules on it keep their
//! chatter behind a const they can flip off without touching call sites:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_warn};
//!
//! log_warn!("ignoring detection without payload");
//! ```

/// Environment switch for verbose per-detection geometry traces.
pub const DEBUG_ENV_VAR: &str = "MATRIXSCAN_DEBUG";

/// `MATRIXSCAN_DEBUG=1` or `MATRIXSCAN_DEBUG=true` (any case).
pub fn debug_mode_from_env() -> bool {
    std::env::var(DEBUG_ENV_VAR)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
