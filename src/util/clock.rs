//! Wall-clock helpers shared by the registry and audit layers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Milliseconds elapsed since `earlier_ms`, saturating at zero if the clock
/// moved backwards.
pub fn elapsed_ms(earlier_ms: u128, now_ms: u128) -> u128 {
    now_ms.saturating_sub(earlier_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        // Sanity: later than 2020-01-01.
        assert!(a > 1_577_836_800_000);
    }

    #[test]
    fn test_elapsed_saturates() {
        assert_eq!(elapsed_ms(100, 250), 150);
        assert_eq!(elapsed_ms(250, 100), 0);
    }
}
