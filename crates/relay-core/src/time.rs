//! Wall-clock timestamps in the wire format (Unix epoch nanoseconds).

use chrono::Utc;

/// Current time as Unix epoch nanoseconds.
///
/// Saturates to `0` outside the representable range (year 2262 and later).
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(now_nanos() > 1_577_836_800_000_000_000);
    }

    #[test]
    fn now_is_non_decreasing() {
        let a = now_nanos();
        let b = now_nanos();
        assert!(b >= a);
    }
}
