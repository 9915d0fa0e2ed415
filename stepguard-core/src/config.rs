//! Device Configuration
//!
//! Every tunable the detection-and-reporting pipeline recognizes, with the
//! defaults observed on deployed units. Broker connectivity (address, port,
//! credentials, backoff) is configured on the connector side, in
//! `stepguard-connectors`, so this struct stays free of transport concerns.

use core::time::Duration;

/// Default impact threshold in m/s²
///
/// Deployments tune between 20.0 (sensitive) and 50.0 (conservative).
pub const DEFAULT_IMPACT_THRESHOLD: f32 = 30.0;

/// Default settle delay between impact and tilt confirmation
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Default heartbeat report interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(120);

/// Default liveness-pulse interval on the status channel
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

/// Default polling-loop cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Impact threshold in m/s² (see [`DEFAULT_IMPACT_THRESHOLD`])
    pub impact_threshold: f32,
    /// Wait between impact and tilt confirmation
    pub settle_delay: Duration,
    /// Interval between heartbeat reports, measured since the last report
    /// of any kind
    pub heartbeat_interval: Duration,
    /// Interval between `"online"` pulses on the status channel
    pub liveness_interval: Duration,
    /// Cadence of the cooperative polling loop
    pub poll_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            impact_threshold: DEFAULT_IMPACT_THRESHOLD,
            settle_delay: DEFAULT_SETTLE_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DeviceConfig {
    /// Set the impact threshold in m/s²
    pub fn impact_threshold(mut self, threshold: f32) -> Self {
        self.impact_threshold = threshold;
        self
    }

    /// Set the settle delay before tilt confirmation
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the heartbeat report interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the liveness-pulse interval
    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Set the polling-loop cadence
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
