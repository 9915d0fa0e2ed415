//! Error Types for the Reporting Pipeline
//!
//! Kept small and `Copy`, in the same spirit as the rest of the pipeline:
//! errors travel through hot polling paths and must not allocate. Sensing
//! failures are deliberately *not* errors; an absent accelerometer degrades
//! the device to SOS-only operation, it never halts it.

use thiserror_no_std::Error;

/// Errors raised while turning a report into a wire payload
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    /// Serialized payload exceeds the practical transport message limit
    ///
    /// The report is dropped and logged rather than truncated silently; the
    /// aggregator already bounds the magnitude array, so hitting this
    /// indicates a configuration problem, not normal operation.
    #[error("payload of {size} bytes exceeds the {limit} byte wire limit")]
    PayloadTooLarge {
        /// Serialized size in bytes
        size: usize,
        /// Configured wire limit in bytes
        limit: usize,
    },

    /// Payload could not be serialized at all
    #[error("report serialization failed")]
    Serialization,
}
