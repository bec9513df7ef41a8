//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Chatty modules (the acquisition loop) define the flag and use these
//! instead of the bare `log` macros, so their output can be switched off
//! without touching filter configuration:
//!
//! ```rust
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn, log_error};
//! ```

/// Info-level logging, compiled against the calling module's
/// `ENABLE_LOGS` const.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level logging, compiled against the calling module's
/// `ENABLE_LOGS` const.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level logging, compiled against the calling module's
/// `ENABLE_LOGS` const.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
