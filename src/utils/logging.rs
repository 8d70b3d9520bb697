//! Conditional logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! // In the game module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info, log_warn};
//!
//! log_info!("focus game started (generation {})", generation);
//! ```
//!
//! Engine modules log the per-round chatter at debug level and the lifecycle
//! transitions (start, completion, finalize) at info level, so `RUST_LOG=info`
//! shows one line per game and `RUST_LOG=teddy_games=debug` shows every round.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` once. Reads `RUST_LOG`, falling back to `info`.
///
/// Safe to call from every host entry point; later calls are ignored.
pub fn init_logging() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .try_init();
    });
}

/// Conditional debug logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Conditional info logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional warn logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Conditional error logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
