//! Two-Stage Fall Confirmation State Machine
//!
//! ## Overview
//!
//! A single high-magnitude sample is not a fall: a dropped phone, a door
//! slam against the wrist, or a stumble all spike the accelerometer. The
//! monitor therefore sequences two signals:
//!
//! ```text
//! Idle ──impact──▶ ImpactPending ──next poll──▶ Confirming ──deadline──▶ verdict
//!                                                              │
//!                                              tilt inclined ──┴── Confirmed
//!                                              tilt upright  ──┴── Rejected
//! ```
//!
//! The settle delay between impact and tilt check (1.5 s by default) lets
//! the wearer's body reach its final resting orientation before the tilt
//! switch is consulted. The wait is a monotonic deadline, not a blocking
//! sleep, so the polling loop keeps servicing the SOS button and the
//! network while a confirmation window is open.
//!
//! ## Non-Overlapping Windows
//!
//! Impacts classified while a window is already open do **not** restart or
//! extend it; the caller still records their magnitudes to the buffer, but
//! only one confirmation sequence runs at a time. [`FallMonitor::on_impact`]
//! returns whether the impact opened a new window so the caller can tell the
//! two cases apart.

use crate::time::Timestamp;

/// Phase of the confirmation sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallPhase {
    /// No impact under evaluation
    Idle,
    /// Impact accepted; the confirmation window opens on the next poll
    ImpactPending {
        /// Magnitude of the impact that opened the sequence
        magnitude: f32,
    },
    /// Waiting out the settle delay before the tilt check
    Confirming {
        /// Magnitude of the impact that opened the sequence
        magnitude: f32,
        /// Monotonic deadline at which the tilt sensor is read
        deadline: Timestamp,
    },
}

/// Outcome of a completed confirmation sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallVerdict {
    /// Tilt sensor read "inclined" at the deadline: this was a fall
    Confirmed {
        /// Magnitude of the confirming impact
        magnitude: f32,
    },
    /// Device upright at the deadline: impact without a fall
    Rejected {
        /// Magnitude of the rejected impact
        magnitude: f32,
    },
}

/// Impact-then-tilt confirmation state machine
#[derive(Debug)]
pub struct FallMonitor {
    phase: FallPhase,
    settle_delay_ms: u64,
}

impl FallMonitor {
    /// Create a monitor with the given settle delay in milliseconds
    pub fn new(settle_delay_ms: u64) -> Self {
        Self {
            phase: FallPhase::Idle,
            settle_delay_ms,
        }
    }

    /// Current phase
    pub fn phase(&self) -> FallPhase {
        self.phase
    }

    /// No confirmation sequence in flight
    pub fn is_idle(&self) -> bool {
        self.phase == FallPhase::Idle
    }

    /// Register a classified impact
    ///
    /// Returns `true` when the impact opened a new confirmation sequence,
    /// `false` when a sequence was already running (the impact is recorded
    /// by the caller but does not restart the window).
    pub fn on_impact(&mut self, magnitude: f32) -> bool {
        match self.phase {
            FallPhase::Idle => {
                self.phase = FallPhase::ImpactPending { magnitude };
                true
            }
            _ => false,
        }
    }

    /// Advance the state machine
    ///
    /// `read_tilt` is only invoked when the settle deadline has elapsed, so
    /// the tilt sensor is sampled exactly once per sequence, at the end of
    /// the delay. Returns a verdict when a sequence resolves; the monitor is
    /// back in [`FallPhase::Idle`] as soon as a verdict is produced.
    pub fn poll<F>(&mut self, now: Timestamp, read_tilt: F) -> Option<FallVerdict>
    where
        F: FnOnce() -> bool,
    {
        match self.phase {
            FallPhase::Idle => None,
            FallPhase::ImpactPending { magnitude } => {
                self.phase = FallPhase::Confirming {
                    magnitude,
                    deadline: now + self.settle_delay_ms,
                };
                None
            }
            FallPhase::Confirming { magnitude, deadline } => {
                if now < deadline {
                    return None;
                }

                self.phase = FallPhase::Idle;

                if read_tilt() {
                    Some(FallVerdict::Confirmed { magnitude })
                } else {
                    Some(FallVerdict::Rejected { magnitude })
                }
            }
        }
    }
}
