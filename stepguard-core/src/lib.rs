//! Core fall-detection and reporting pipeline for StepGuard wearables
//!
//! Turns a noisy accelerometer impact signal plus a tilt confirmation signal
//! into deduplicated, aggregated reports, under the timing rules real
//! deployments run with (settle delay, heartbeat baseline, liveness pulse).
//!
//! Key constraints:
//! - Detection logic is `no_std`-capable and heap-free (heapless buffers)
//! - Sensing failures degrade the device, they never halt it
//! - Delivery is at-most-once: the impact buffer drains per attempt
//!
//! ```no_run
//! use stepguard_core::{AccelSample, ImpactClassifier};
//!
//! let classifier = ImpactClassifier::new(30.0);
//! let c = classifier.classify(&AccelSample::new(20.0, 20.0, 20.0));
//!
//! assert!(c.is_impact); // ~34.64 m/s² against a 30.0 threshold
//! ```
//!
//! Network delivery lives in the companion `stepguard-connectors` crate,
//! behind the [`report::ReportLink`] seam.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod fall;
pub mod hal;
pub mod impact;
pub mod scheduler;
pub mod time;

#[cfg(feature = "std")]
pub mod device;
#[cfg(feature = "std")]
pub mod identity;
#[cfg(feature = "std")]
pub mod report;

// Public API
pub use aggregator::{DrainedImpacts, ImpactLog, MAX_BUFFERED_IMPACTS};
pub use config::DeviceConfig;
pub use errors::ReportError;
pub use fall::{FallMonitor, FallPhase, FallVerdict};
pub use hal::{Board, Icon};
pub use impact::{AccelSample, Classification, ImpactClassifier};
pub use scheduler::{ReportScheduler, ReportTrigger};
pub use time::{TimeSource, Timestamp};

#[cfg(feature = "std")]
pub use device::{CancelToken, Device};
#[cfg(feature = "std")]
pub use identity::DeviceIdentity;
#[cfg(feature = "std")]
pub use report::{Report, ReportLink, MAX_PAYLOAD_BYTES};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
