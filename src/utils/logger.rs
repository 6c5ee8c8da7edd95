use std::io;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::ConfigSnapshot;
use crate::constants::LOG_PREFIX;

/// Initialize the logging system
pub fn init_logger(verbose: bool) {
    // RUST_LOG wins; otherwise info, or debug when verbose
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr) // Keep stdout for post output
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .try_init();
}

/// Log an info message with the MuChat prefix
pub fn log_info(message: impl std::fmt::Display) {
    info!("{} {}", LOG_PREFIX, message);
}

/// Log a warning with the MuChat prefix
pub fn log_warn(message: impl std::fmt::Display) {
    warn!("{} {}", LOG_PREFIX, message);
}

/// Log a failure with the MuChat prefix and the step it happened in
pub fn log_error(context: &str, err: impl std::fmt::Display) {
    error!("{} error: {} | {}", LOG_PREFIX, err, context);
}

/// Diagnostics switched on by `enable_debug`.
///
/// Emitted at info level so they show up without touching RUST_LOG; with the
/// flag off they still reach the debug level.
pub fn log_debug(snapshot: &ConfigSnapshot, message: impl std::fmt::Display) {
    if snapshot.debug {
        info!("{} {}", LOG_PREFIX, message);
    } else {
        debug!("{} {}", LOG_PREFIX, message);
    }
}
