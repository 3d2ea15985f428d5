//! Logging macros gated by a per-module `ENABLE_LOGS` switch.
//!
//! Modules that talk to the camera or the backend log on every call, which
//! gets noisy during a long capture session. Those modules declare
//! `const ENABLE_LOGS: bool` and log through these macros so their output can
//! be silenced without touching `RUST_LOG` for the rest of the app.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("camera stream acquired");
//! ```

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

/// Errors are usually worth keeping even in quiet modules, but the switch is
/// honoured for symmetry.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
