//! Device Identity
//!
//! Derived once at startup from a hardware-stable 6-byte identifier (the
//! WiFi MAC on real hardware) and immutable for the process lifetime. The
//! same value is used as the identity field of every payload and, through
//! [`DeviceIdentity::client_id`], as the broker client identifier. The
//! backend keys devices by it, so it must never change across reconnects.

use core::fmt;

/// Stable device identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    id: String,
}

impl DeviceIdentity {
    /// Derive the identity from a 6-byte hardware seed
    ///
    /// Formats as a colon-separated uppercase MAC string, e.g.
    /// `A4:CF:12:9B:20:01`.
    pub fn from_seed(seed: [u8; 6]) -> Self {
        Self {
            id: format!(
                "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                seed[0], seed[1], seed[2], seed[3], seed[4], seed[5]
            ),
        }
    }

    /// Identity string carried in the `mac` payload field
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Broker client identifier derived from the identity
    ///
    /// Colons stripped so the id stays broker-friendly, e.g.
    /// `stepguard-A4CF129B2001`.
    pub fn client_id(&self) -> String {
        format!("stepguard-{}", self.id.replace(':', ""))
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
