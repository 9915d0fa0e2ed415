//! Broker Connectivity for StepGuard Wearables
//!
//! ## Overview
//!
//! This crate owns the network delivery layer of the pipeline: connection
//! lifecycle, reconnect supervision, and serialization of reports onto the
//! wire. The detection logic in `stepguard-core` talks to it exclusively
//! through the `ReportLink` seam, so everything here can be swapped out or
//! mocked without touching the pipeline.
//!
//! ## Delivery Guarantees
//!
//! Reports are best-effort, at-most-once:
//!
//! - `publish` makes exactly one attempt; the caller drains its buffer
//!   whatever the outcome.
//! - Reconnection is supervised and *blocking*: a fixed backoff, retried
//!   forever. The wearer has no way to abort a stuck reconnect short of
//!   power-cycling, so the loop only yields to a [`CancelToken`], the hook
//!   tests and orderly shutdowns use.
//!
//! ## Channels
//!
//! Two per device, namespaced by the device identity:
//!
//! | Channel | Topic | Payload |
//! |---------|-------|---------|
//! | Telemetry | `stepguard/<mac>` | JSON report |
//! | Status | `stepguard/status/<mac>` | `"online"` / `"offline"` |
//!
//! The status channel carries the `"online"` marker on every (re)connection
//! and on each liveness pulse; the broker's Last Will publishes `"offline"`
//! when the session dies uncleanly. The backend distinguishes "alive,
//! nothing to report" from "offline" with nothing but these markers.

use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use thiserror::Error;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttError, MqttLink};

pub use stepguard_core::CancelToken;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No broker session at publish time
    #[error("not connected")]
    NotConnected,

    /// Payload failed the wire-format bounds
    #[error("payload rejected: {0}")]
    Payload(stepguard_core::ReportError),

    /// Transport-level failure
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Trait for all protocol connectors
pub trait Connector {
    /// Transport-specific error
    type Error;

    /// Send a raw payload to a topic
    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;
}

/// Connection lifecycle of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    /// No session; not currently attempting one
    Disconnected = 0,
    /// Attempting to establish a session
    Connecting = 1,
    /// Session established and authenticated
    Connected = 2,
}

/// Shared, atomically updated link state
///
/// Written by the connector's event loop, read by whoever blocks in
/// [`LinkStatus::wait_until_connected`].
#[derive(Debug)]
pub struct LinkStatus {
    state: AtomicU8,
}

impl LinkStatus {
    /// Poll slice while waiting for a session; keeps cancellation responsive
    const WAIT_SLICE: Duration = Duration::from_millis(25);

    /// Create with an initial state
    pub fn new(initial: LinkState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    /// Current state
    pub fn load(&self) -> LinkState {
        match self.state.load(Ordering::Acquire) {
            2 => LinkState::Connected,
            1 => LinkState::Connecting,
            _ => LinkState::Disconnected,
        }
    }

    /// Update the state
    pub fn store(&self, state: LinkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Block until the link reports [`LinkState::Connected`]
    ///
    /// Returns `false` only when the token is cancelled; the default
    /// behavior is to wait forever. The actual connection attempts and
    /// their backoff pacing run in the connector's event loop; this merely
    /// observes.
    pub fn wait_until_connected(&self, cancel: &CancelToken) -> bool {
        loop {
            if self.load() == LinkState::Connected {
                return true;
            }
            if cancel.is_cancelled() {
                return false;
            }
            thread::sleep(Self::WAIT_SLICE);
        }
    }
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of (re)connections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}
