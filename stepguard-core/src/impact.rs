//! Impact Classification from Raw Acceleration Samples
//!
//! ## Overview
//!
//! First stage of the fall pipeline: turn one 3-axis accelerometer sample
//! into a scalar impact magnitude and a boolean verdict against the
//! configured threshold. The classifier is a pure function of the sample and
//! the threshold; all state (confirmation windows, buffering) lives
//! downstream in [`crate::fall`] and [`crate::aggregator`].
//!
//! ## Fail-Safe Behavior
//!
//! The pipeline must never fabricate a fall from bad sensing:
//! - Non-finite axis values (NaN, ±inf from a glitched I2C read) classify as
//!   `is_impact = false` with magnitude `0.0`.
//! - An absent sensor is handled one level up: the caller checks
//!   [`crate::hal::Accelerometer::is_available`] and skips classification
//!   entirely, degrading the device to SOS-only operation.
//!
//! ## Threshold Tuning
//!
//! Deployments tune the threshold between roughly 20 m/s² (sensitive, more
//! false positives) and 50 m/s² (conservative). Gravity alone contributes
//! ~9.8 m/s², so anything below ~15 would trigger on brisk walking.

use crate::config::DEFAULT_IMPACT_THRESHOLD;

/// One 3-axis accelerometer reading, in m/s²
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelSample {
    /// X-axis acceleration
    pub x: f32,
    /// Y-axis acceleration
    pub y: f32,
    /// Z-axis acceleration
    pub z: f32,
}

impl AccelSample {
    /// Build a sample from raw axis readings
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// A zero sample, as produced by an absent sensor
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Euclidean norm of the sample
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    /// All three axes are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Result of classifying a single sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Euclidean norm of the sample (0.0 for invalid samples)
    pub magnitude: f32,
    /// Magnitude strictly exceeded the threshold
    pub is_impact: bool,
}

/// Threshold classifier for impact detection
#[derive(Debug, Clone)]
pub struct ImpactClassifier {
    threshold: f32,
}

impl Default for ImpactClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_IMPACT_THRESHOLD)
    }
}

impl ImpactClassifier {
    /// Create a classifier with the given threshold in m/s²
    ///
    /// Negative thresholds make no physical sense and are clamped to zero.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(0.0),
        }
    }

    /// Configured threshold in m/s²
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify one sample
    ///
    /// Pure: no side effects, no history. Invalid (non-finite) samples never
    /// classify as an impact.
    pub fn classify(&self, sample: &AccelSample) -> Classification {
        if !sample.is_finite() {
            return Classification {
                magnitude: 0.0,
                is_impact: false,
            };
        }

        let magnitude = sample.magnitude();

        Classification {
            magnitude,
            is_impact: magnitude > self.threshold,
        }
    }
}
