//! Graceful shutdown support via atomic flag
//!
//! The scheduler checks this flag before starting a cycle; a cycle that is
//! already running is never interrupted.

use std::sync::atomic::AtomicBool;

/// Global shutdown flag, set by the SIGTERM/SIGINT handler
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}
