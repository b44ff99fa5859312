//! Wall-clock timestamp and duration types (spec §3).
//!
//! Both are unsigned and saturate at zero rather than panicking on
//! underflow, since a consensus node will never report a negative time.

use std::time::SystemTime;

/// Seconds since the Unix epoch plus sub-second nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub seconds: u64,
    pub nanos: u32,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { seconds: 0, nanos: 0 };

    /// The current wall-clock time.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(std::time::Duration::ZERO);
        Self { seconds: since_epoch.as_secs(), nanos: since_epoch.subsec_nanos() }
    }

    /// Add a whole number of nanoseconds, carrying into seconds.
    pub fn plus_nanos(self, nanos: u64) -> Self {
        let total = u64::from(self.nanos) + nanos;
        Self { seconds: self.seconds + total / 1_000_000_000, nanos: (total % 1_000_000_000) as u32 }
    }

    /// Saturating subtraction; never goes below `Timestamp::ZERO`.
    pub fn saturating_sub(self, other: Duration) -> Self {
        let self_nanos = self.as_total_nanos();
        let other_nanos = other.as_total_nanos();
        let result = self_nanos.saturating_sub(other_nanos);
        Self::from_total_nanos(result)
    }

    pub fn as_total_nanos(self) -> u128 {
        u128::from(self.seconds) * 1_000_000_000 + u128::from(self.nanos)
    }

    fn from_total_nanos(nanos: u128) -> Self {
        Self {
            seconds: (nanos / 1_000_000_000) as u64,
            nanos: (nanos % 1_000_000_000) as u32,
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// A seconds/nanos duration, with the same saturating-at-zero arithmetic
/// as [`Timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    pub seconds: u64,
    pub nanos: u32,
}

impl Duration {
    pub const ZERO: Duration = Duration { seconds: 0, nanos: 0 };

    pub fn from_secs(seconds: u64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn as_total_nanos(self) -> u128 {
        u128::from(self.seconds) * 1_000_000_000 + u128::from(self.nanos)
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self { seconds: d.as_secs(), nanos: d.subsec_nanos() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_nanos_carries_into_seconds() {
        let t = Timestamp { seconds: 100, nanos: 999_999_999 };
        let t2 = t.plus_nanos(2);
        assert_eq!(t2.seconds, 101);
        assert_eq!(t2.nanos, 1);
    }

    #[test]
    fn saturating_sub_never_underflows() {
        let t = Timestamp { seconds: 1, nanos: 0 };
        let d = Duration::from_secs(10);
        assert_eq!(t.saturating_sub(d), Timestamp::ZERO);
    }

    #[test]
    fn saturating_sub_normal_case() {
        let t = Timestamp { seconds: 100, nanos: 500 };
        let d = Duration { seconds: 10, nanos: 100 };
        let result = t.saturating_sub(d);
        assert_eq!(result, Timestamp { seconds: 90, nanos: 400 });
    }

    #[test]
    fn display_pads_nanos() {
        let t = Timestamp { seconds: 5, nanos: 7 };
        assert_eq!(t.to_string(), "5.000000007");
    }
}
