//! Logging setup on top of env_logger
//!
//! Every pipeline failure surfaces only through these log lines, so the
//! non-debug format still carries a timestamp and the level label.

use std::io::Write;

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Default filter for the given verbosity flags (`RUST_LOG` still wins).
pub fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize logging.
///
/// `color` enables ANSI level colors (use when stderr is a terminal).
pub fn init_logging(quiet: bool, debug: bool, color: bool) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level(quiet, debug)),
    )
    .format(move |buf, record| {
        let (pre, label, post) = level_style(record.level(), color);
        writeln!(
            buf,
            "{} [{pre}{label}{post}] {}",
            buf.timestamp_millis(),
            record.args()
        )
    })
    .init();
}
