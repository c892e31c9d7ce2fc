// src/logging.rs

//! Logging setup for `parsewatch` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. the level configured on the session (if provided)
//! 2. `PARSEWATCH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`

use tracing_subscriber::fmt;

/// Initialise the global logging subscriber.
///
/// `plain` disables ANSI colouring for environments that capture stderr.
/// Uses `try_init` so that an embedding application which already installed
/// its own subscriber keeps it; in that case the session's level and
/// plain-logging settings have no effect.
pub fn init_logging(level: Option<tracing::Level>, plain: bool) {
    let level = match level {
        Some(lvl) => lvl,
        None => std::env::var("PARSEWATCH_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    let _ = fmt()
        .with_max_level(level)
        .with_ansi(!plain)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
