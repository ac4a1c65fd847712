//! Configurable limits for packet admission.

use crate::header::MAX_CLOCK_SKEW_SECS;

/// Wire-level limits applied before a packet is trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Largest tolerated distance between sender and local clock, in seconds.
    pub max_clock_skew_secs: u32,

    /// Maximum packet size in bytes (header included).
    pub max_packet_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_clock_skew_secs: MAX_CLOCK_SKEW_SECS,
            // largest UDP payload
            max_packet_bytes: 65_535,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_clock_skew_secs: MAX_CLOCK_SKEW_SECS,
            max_packet_bytes: 4096,
        }
    }

    /// Returns `true` if the two epochs are close enough.
    #[must_use]
    pub fn accepts_skew(&self, sender_epoch: i32, local_epoch: i32) -> bool {
        let skew = (i64::from(local_epoch) - i64::from(sender_epoch)).unsigned_abs();
        skew <= u64::from(self.max_clock_skew_secs)
    }
}
