//! Impact Buffer Between Reports
//!
//! ## Overview
//!
//! Every impact the classifier flags is recorded here, whether or not the
//! fall state machine later confirms it. The buffer accumulates between
//! reports and is drained atomically when a report goes out, on *attempted*
//! delivery rather than acknowledged delivery. Reports are at-most-once by
//! design: bounded memory is favored over durability.
//!
//! ## Bounded Storage
//!
//! Storage is a `heapless::Vec` capped at [`MAX_BUFFERED_IMPACTS`]. When the
//! cap is reached the *oldest* magnitude is discarded, while `total` keeps
//! counting. A report whose `impact_count` exceeds the length of
//! `impact_magnitudes` therefore tells the backend that truncation occurred.

use heapless::Vec;

/// Maximum magnitudes retained between reports
///
/// Sized so a full buffer still serializes well inside the wire payload
/// limit (64 floats ≈ 450 bytes of JSON).
pub const MAX_BUFFERED_IMPACTS: usize = 64;

/// Buffered impacts handed over by [`ImpactLog::drain_and_reset`]
#[derive(Debug, Default, Clone)]
pub struct DrainedImpacts {
    /// Retained magnitudes, oldest first (truncated to the newest
    /// [`MAX_BUFFERED_IMPACTS`] when the buffer overflowed)
    pub magnitudes: Vec<f32, MAX_BUFFERED_IMPACTS>,
    /// True number of impacts recorded since the last drain, including any
    /// that were truncated away
    pub total: u32,
}

/// Accumulator for impact magnitudes between reports
#[derive(Debug, Default)]
pub struct ImpactLog {
    magnitudes: Vec<f32, MAX_BUFFERED_IMPACTS>,
    recorded: u32,
}

impl ImpactLog {
    /// Create an empty log
    pub const fn new() -> Self {
        Self {
            magnitudes: Vec::new(),
            recorded: 0,
        }
    }

    /// Append a magnitude, discarding the oldest entry when full
    pub fn record(&mut self, magnitude: f32) {
        self.recorded = self.recorded.saturating_add(1);

        if self.magnitudes.is_full() {
            self.magnitudes.remove(0);
        }

        // Cannot fail: a slot was just freed if the buffer was full
        let _ = self.magnitudes.push(magnitude);
    }

    /// Number of magnitudes currently retained
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    /// No impacts recorded since the last drain
    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    /// Take the buffer contents and reset the log
    ///
    /// Invoked exactly once per report attempt. The reset is atomic from the
    /// caller's perspective: there is no window where the log is partially
    /// drained.
    pub fn drain_and_reset(&mut self) -> DrainedImpacts {
        DrainedImpacts {
            magnitudes: core::mem::take(&mut self.magnitudes),
            total: core::mem::replace(&mut self.recorded, 0),
        }
    }
}
