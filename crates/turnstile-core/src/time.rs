//! Wall-clock helpers for TTL bookkeeping.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Get current Unix timestamp in milliseconds.
///
/// Returns 0 if system time is before the UNIX epoch (should never happen
/// on properly configured systems, but prevents panics).
#[inline]
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_unix_ms_is_monotonic_enough() {
        let first = now_unix_ms();
        let second = now_unix_ms();
        assert!(second >= first);
        // Sanity: after 2020-01-01.
        assert!(first > 1_577_836_800_000);
    }
}
