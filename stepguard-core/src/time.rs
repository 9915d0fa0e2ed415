//! Time management for the reporting pipeline
//!
//! Provides a clock abstraction so the pipeline can run against:
//! - The system clock (NTP-disciplined on real hardware)
//! - A fixed, manually-advanced clock (for tests)
//!
//! All pipeline timing (confirmation deadlines, heartbeat baselines) is
//! expressed in milliseconds through the [`Timestamp`] alias. Wall-clock
//! formatting only happens at the reporting boundary, in [`DeviceClock`].

/// Timestamp in milliseconds since epoch (or device boot for monotonic sources)
pub type Timestamp = u64;

/// Source of time for the pipeline
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    ///
    /// A source that has not yet synchronized to real time must report
    /// `false` so reports carry the documented sentinel instead of a
    /// fabricated date.
    fn is_wall_clock(&self) -> bool;
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
    wall_clock: bool,
}

impl FixedTime {
    /// Create a monotonic fixed source starting at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            wall_clock: false,
        }
    }

    /// Create a fixed source that claims to be wall-clock time
    pub fn wall(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            wall_clock: true,
        }
    }

    /// Set the current timestamp
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance the clock by `ms` milliseconds
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        self.wall_clock
    }
}

/// Sentinel stamped on reports while wall-clock time is unavailable
///
/// Epoch zero, formatted the same way as a synchronized timestamp, so the
/// backend can parse every report with a single format.
#[cfg(feature = "std")]
pub const UNSYNCED_TIMESTAMP: &str = "1970-01-01 00:00:00";

/// Wall-clock formatter over an arbitrary [`TimeSource`]
///
/// Reports carry a `YYYY-MM-DD HH:MM:SS` string. When the underlying source
/// is monotonic (time sync has not completed), [`DeviceClock::timestamp_string`]
/// returns [`UNSYNCED_TIMESTAMP`] rather than failing the report.
#[cfg(feature = "std")]
pub struct DeviceClock<T: TimeSource> {
    source: T,
}

#[cfg(feature = "std")]
impl<T: TimeSource> DeviceClock<T> {
    /// Wrap a time source
    pub fn new(source: T) -> Self {
        Self { source }
    }

    /// Current timestamp in milliseconds
    pub fn now(&self) -> Timestamp {
        self.source.now()
    }

    /// Best-effort formatted wall-clock time for report stamping
    pub fn timestamp_string(&self) -> String {
        if !self.source.is_wall_clock() {
            return UNSYNCED_TIMESTAMP.to_string();
        }

        format_timestamp(self.source.now())
    }
}

/// Format a millisecond timestamp as `YYYY-MM-DD HH:MM:SS` (UTC)
#[cfg(feature = "std")]
pub fn format_timestamp(ms: Timestamp) -> String {
    let secs = (ms / 1000) as i64;

    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        // Out-of-range timestamps degrade to the sentinel, never panic
        None => UNSYNCED_TIMESTAMP.to_string(),
    }
}
