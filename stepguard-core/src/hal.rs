//! Interface Boundary to Sensors and Local Feedback
//!
//! The pipeline never touches registers or GPIO directly. Everything it
//! consumes (accelerometer, tilt switch, SOS button) and everything it
//! drives (LED, vibration motor, 8x8 icon display) enters through the traits
//! in this module, keeping the detection logic host-testable and the
//! platform bring-up out of this crate entirely.
//!
//! Providers fail *silently* by contract: an absent accelerometer reports
//! `is_available() == false` and reads as zeros; the pipeline then degrades
//! to SOS-only operation instead of halting.

use crate::impact::AccelSample;
use crate::time::{TimeSource, Timestamp};

/// Icons the 8x8 matrix display can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    /// All-is-well face, shown during normal operation
    Ok,
    /// SOS cross, shown while a manual alert is being reported
    Sos,
    /// Falling-arrow icon, shown when a fall is confirmed
    Fall,
}

/// 3-axis accelerometer provider
pub trait Accelerometer {
    /// Sensor responded during initialization and is still answering
    ///
    /// When `false`, the caller must suppress fall detection entirely:
    /// classification of fabricated zero samples is not meaningful.
    fn is_available(&self) -> bool;

    /// Read one sample; zeros when the sensor is unavailable
    fn read(&mut self) -> AccelSample;
}

/// Tilt-switch provider: is the device inclined past its trip angle?
pub trait TiltSwitch {
    /// Current tilt state
    fn is_inclined(&mut self) -> bool;
}

/// SOS button provider
///
/// `is_pressed` returns one `true` per accepted press; debouncing is the
/// provider's concern (see [`DebouncedButton`] for raw switches).
pub trait SosButton {
    /// A press is pending
    fn is_pressed(&mut self) -> bool;
}

/// Status LED sink
pub trait StatusLed {
    /// Turn the LED on or off
    fn set(&mut self, on: bool);
}

/// Vibration motor sink
pub trait VibrationMotor {
    /// Run the motor for the given duration
    fn pulse(&mut self, duration_ms: u32);
}

/// 8x8 matrix display sink
pub trait IconDisplay {
    /// Show an icon
    fn show(&mut self, icon: Icon);

    /// Blank the display
    fn clear(&mut self);
}

// Headless builds wire the sinks to ().
impl StatusLed for () {
    fn set(&mut self, _on: bool) {}
}

impl VibrationMotor for () {
    fn pulse(&mut self, _duration_ms: u32) {}
}

impl IconDisplay for () {
    fn show(&mut self, _icon: Icon) {}
    fn clear(&mut self) {}
}

/// Everything the device supervisor polls and drives, gathered in one place
pub struct Board<A, T, B, L, V, D> {
    /// Accelerometer provider
    pub accel: A,
    /// Tilt-switch provider
    pub tilt: T,
    /// SOS button provider
    pub button: B,
    /// Tilt indicator LED
    pub led: L,
    /// Vibration motor
    pub vibration: V,
    /// Icon display
    pub display: D,
}

/// Default hold-off between accepted SOS presses
pub const DEBOUNCE_HOLDOFF_MS: u64 = 200;

/// Debounce adapter for raw button providers
///
/// Accepts a press, then ignores the (bouncing, or still-held) contact for
/// the hold-off window. Wrap a raw GPIO-backed provider in this when the
/// platform does not debounce in hardware.
pub struct DebouncedButton<B, C> {
    inner: B,
    clock: C,
    holdoff_ms: u64,
    last_accept: Option<Timestamp>,
}

impl<B: SosButton, C: TimeSource> DebouncedButton<B, C> {
    /// Wrap `inner` with the default hold-off
    pub fn new(inner: B, clock: C) -> Self {
        Self::with_holdoff(inner, clock, DEBOUNCE_HOLDOFF_MS)
    }

    /// Wrap `inner` with a custom hold-off in milliseconds
    pub fn with_holdoff(inner: B, clock: C, holdoff_ms: u64) -> Self {
        Self {
            inner,
            clock,
            holdoff_ms,
            last_accept: None,
        }
    }
}

impl<B: SosButton, C: TimeSource> SosButton for DebouncedButton<B, C> {
    fn is_pressed(&mut self) -> bool {
        if !self.inner.is_pressed() {
            return false;
        }

        let now = self.clock.now();
        match self.last_accept {
            Some(last) if now.saturating_sub(last) < self.holdoff_ms => false,
            _ => {
                self.last_accept = Some(now);
                true
            }
        }
    }
}
