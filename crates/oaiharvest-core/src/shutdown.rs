//! Graceful shutdown support via atomic flag.
//!
//! SIGINT/SIGTERM set the flag; the harvest loop polls it between items and
//! stops cleanly, leaving the checkpoint for the next run.

use std::io;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};

static FLAG: LazyLock<Arc<AtomicBool>> = LazyLock::new(|| Arc::new(AtomicBool::new(false)));

/// Register SIGINT/SIGTERM handlers that set the shutdown flag.
pub fn install_signal_handlers() -> io::Result<()> {
    signal_hook::flag::register(SIGINT, Arc::clone(&FLAG))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&FLAG))?;
    Ok(())
}

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    FLAG.load(Ordering::Relaxed)
}

/// Request shutdown (for signal handlers and tests)
pub fn request_shutdown() {
    FLAG.store(true, Ordering::Relaxed);
}
