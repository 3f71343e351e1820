//! Shared voice utilities.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static STEM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since UNIX epoch.
#[inline]
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// File stem unique within and across processes sharing a temp dir:
/// millisecond timestamp, pid, then a process-wide counter.
pub(crate) fn unique_stem(prefix: &str) -> String {
    let n = STEM_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}_{}", prefix, now_ms(), std::process::id(), n)
}
