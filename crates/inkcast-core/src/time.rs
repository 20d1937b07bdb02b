//! Millisecond wall clock for shape and history timestamps.

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since the Unix epoch, never going backwards within a process.
pub fn now_millis() -> u64 {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let previous = LAST_MILLIS.fetch_max(wall, Ordering::Relaxed);
    wall.max(previous)
}
