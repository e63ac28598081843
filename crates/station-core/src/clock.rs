//! Local time of day for the status record.
//!
//! The station only needs hour, minute and second. Time comes from SNTP; the
//! firmware owns the UDP socket and hands the answer to [`SyncedClock`].

use core::fmt;
use core::future::Future;

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    /// `seconds` is reduced modulo one day.
    pub const fn from_seconds_of_day(seconds: u32) -> Self {
        let seconds = seconds % SECONDS_PER_DAY as u32;
        Self::new(
            (seconds / 3600) as u8,
            ((seconds / 60) % 60) as u8,
            (seconds % 60) as u8,
        )
    }

    pub fn from_unix(unix_seconds: u64, offset: UtcOffset) -> Self {
        let local = (unix_seconds % SECONDS_PER_DAY as u64) as i64 + offset.total_seconds();
        Self::from_seconds_of_day(local.rem_euclid(SECONDS_PER_DAY) as u32)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Offset from UTC, split the way POSIX `configTime` takes it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcOffset {
    pub gmt_offset_secs: i32,
    pub daylight_offset_secs: i32,
}

impl UtcOffset {
    pub const UTC: UtcOffset = UtcOffset {
        gmt_offset_secs: 0,
        daylight_offset_secs: 0,
    };

    pub const fn total_seconds(&self) -> i64 {
        self.gmt_offset_secs as i64 + self.daylight_offset_secs as i64
    }
}

impl Default for UtcOffset {
    /// Central European summer time.
    fn default() -> Self {
        Self {
            gmt_offset_secs: 3600,
            daylight_offset_secs: 3600,
        }
    }
}

/// Source of the local time of day.
pub trait Clock {
    /// `None` when no valid time has been obtained yet.
    fn try_get_local_time(&mut self) -> impl Future<Output = Option<TimeOfDay>>;
}

/// Wall clock anchored to the last SNTP answer.
///
/// Time of day is the anchor plus the monotonic time elapsed since it was
/// taken. Re-anchor whenever a fresh answer is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedClock {
    offset: UtcOffset,
    anchor: Option<(u64, Instant)>,
}

impl SyncedClock {
    pub const fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            anchor: None,
        }
    }

    pub const fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    /// Record that `unix_seconds` was current at `at`.
    pub fn sync(&mut self, unix_seconds: u64, at: Instant) {
        self.anchor = Some((unix_seconds, at));
    }

    pub fn unix_seconds_at(&self, now: Instant) -> Option<u64> {
        let (unix_seconds, at) = self.anchor?;
        let elapsed = now.checked_duration_since(at).unwrap_or(Duration::from_ticks(0));
        Some(unix_seconds + elapsed.as_secs())
    }

    pub fn time_at(&self, now: Instant) -> Option<TimeOfDay> {
        self.unix_seconds_at(now)
            .map(|secs| TimeOfDay::from_unix(secs, self.offset))
    }
}

/// Minimal SNTP (RFC 4330) client packet handling.
pub mod sntp {
    pub const PORT: u16 = 123;
    pub const PACKET_LEN: usize = 48;

    /// Seconds between the NTP era origin (1900) and the unix epoch.
    pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

    const TRANSMIT_TIMESTAMP: usize = 40;

    /// Client request: leap indicator 0, version 3, mode 3.
    pub const fn request_packet() -> [u8; PACKET_LEN] {
        let mut packet = [0u8; PACKET_LEN];
        packet[0] = 0x1B;
        packet
    }

    /// Unix seconds from a server reply's transmit timestamp.
    pub fn parse_unix_seconds(reply: &[u8]) -> Option<u64> {
        let bytes = reply.get(TRANSMIT_TIMESTAMP..TRANSMIT_TIMESTAMP + 4)?;
        let ntp_seconds = u64::from(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        if ntp_seconds == 0 {
            return None;
        }
        ntp_seconds.checked_sub(NTP_UNIX_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unix_with_offset() {
        // 2024-06-01 07:05:03 UTC
        let unix = 1_717_225_503;
        assert_eq!(TimeOfDay::from_unix(unix, UtcOffset::UTC), TimeOfDay::new(7, 5, 3));
        assert_eq!(
            TimeOfDay::from_unix(unix, UtcOffset::default()),
            TimeOfDay::new(9, 5, 3)
        );
    }

    #[test]
    fn test_offset_wraps_across_midnight() {
        let late = 1_717_199_999; // 23:59:59 UTC
        assert_eq!(
            TimeOfDay::from_unix(late, UtcOffset::default()),
            TimeOfDay::new(1, 59, 59)
        );

        let early = 1_717_200_000 + 1800; // 00:30:00 UTC
        let west = UtcOffset {
            gmt_offset_secs: -5 * 3600,
            daylight_offset_secs: 0,
        };
        assert_eq!(TimeOfDay::from_unix(early, west), TimeOfDay::new(19, 30, 0));
    }

    #[test]
    fn test_display_zero_padded() {
        extern crate std;
        assert_eq!(std::format!("{}", TimeOfDay::new(9, 5, 3)), "09:05:03");
    }

    #[test]
    fn test_sntp_request_header() {
        let packet = sntp::request_packet();
        assert_eq!(packet[0] >> 6, 0, "leap indicator");
        assert_eq!((packet[0] >> 3) & 0x07, 3, "version");
        assert_eq!(packet[0] & 0x07, 3, "client mode");
        assert!(packet[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sntp_parse_transmit_timestamp() {
        let mut reply = [0u8; sntp::PACKET_LEN];
        let ntp = (1_717_225_503u64 + sntp::NTP_UNIX_OFFSET) as u32;
        reply[40..44].copy_from_slice(&ntp.to_be_bytes());
        assert_eq!(sntp::parse_unix_seconds(&reply), Some(1_717_225_503));
    }

    #[test]
    fn test_sntp_rejects_bad_replies() {
        assert_eq!(sntp::parse_unix_seconds(&[0u8; 20]), None);
        assert_eq!(sntp::parse_unix_seconds(&[0u8; sntp::PACKET_LEN]), None);

        let mut before_epoch = [0u8; sntp::PACKET_LEN];
        before_epoch[40..44].copy_from_slice(&1u32.to_be_bytes());
        assert_eq!(sntp::parse_unix_seconds(&before_epoch), None);
    }

    #[test]
    fn test_synced_clock_advances_with_monotonic_time() {
        let mut clock = SyncedClock::new(UtcOffset::UTC);
        let start = Instant::from_secs(100);
        assert_eq!(clock.time_at(start), None);

        clock.sync(1_717_225_503, start);
        assert!(clock.is_synced());
        assert_eq!(clock.time_at(start), Some(TimeOfDay::new(7, 5, 3)));
        assert_eq!(
            clock.time_at(start + Duration::from_secs(600)),
            Some(TimeOfDay::new(7, 15, 3))
        );
        // An instant before the anchor does not move time backwards.
        assert_eq!(clock.time_at(Instant::from_secs(5)), Some(TimeOfDay::new(7, 5, 3)));
    }
}
