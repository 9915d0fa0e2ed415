//! Device Supervisor: the Cooperative Polling Loop
//!
//! ## Overview
//!
//! One explicit application context owns every piece of pipeline state
//! (classifier, confirmation monitor, impact log, scheduler, clock,
//! identity) together with the board peripherals and the report link. There
//! are no ambient globals: construct a [`Device`] once at startup, then
//! drive it.
//!
//! ## Scheduling Model
//!
//! A single logical thread of control. [`Device::service`] is one tick,
//! servicing in priority order:
//!
//! 1. SOS button (never starved)
//! 2. fall-detection pipeline (classify → record → confirm)
//! 3. heartbeat report
//! 4. liveness pulse
//! 5. network maintenance
//!
//! The only points where a tick can stall are deliberate: the settle delay
//! is a monotonic deadline (no blocking), and `maintain` blocks through
//! reconnection when the link is down. While the link is down, everything
//! else pauses. That trade-off is accepted: the device has nothing useful
//! to do with a dead uplink beyond local feedback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::aggregator::ImpactLog;
use crate::config::DeviceConfig;
use crate::fall::{FallMonitor, FallPhase, FallVerdict};
use crate::hal::{
    Accelerometer, Board, Icon, IconDisplay, SosButton, StatusLed, TiltSwitch, VibrationMotor,
};
use crate::identity::DeviceIdentity;
use crate::impact::ImpactClassifier;
use crate::report::{Report, ReportLink};
use crate::scheduler::{ReportScheduler, ReportTrigger};
use crate::time::{DeviceClock, TimeSource, Timestamp};

/// Vibration feedback length for SOS and confirmed-fall events
const FEEDBACK_PULSE_MS: u32 = 500;

/// Cooperative cancellation handle
///
/// Cloned into whatever needs to stop the device: the run loop checks it
/// every tick, and the connector's reconnect loop checks it every backoff.
/// The reference behavior is "retry forever"; the token exists so tests and
/// orderly shutdowns can break out.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Top-level application context
pub struct Device<A, T, B, L, V, D, Link, C: TimeSource> {
    board: Board<A, T, B, L, V, D>,
    link: Link,
    clock: DeviceClock<C>,
    identity: DeviceIdentity,
    classifier: ImpactClassifier,
    monitor: FallMonitor,
    impacts: ImpactLog,
    scheduler: ReportScheduler,
    poll_interval: Duration,
}

impl<A, T, B, L, V, D, Link, C> Device<A, T, B, L, V, D, Link, C>
where
    A: Accelerometer,
    T: TiltSwitch,
    B: SosButton,
    L: StatusLed,
    V: VibrationMotor,
    D: IconDisplay,
    Link: ReportLink,
    C: TimeSource,
{
    /// Assemble the pipeline from its parts
    pub fn new(
        config: &DeviceConfig,
        identity: DeviceIdentity,
        board: Board<A, T, B, L, V, D>,
        clock: C,
        link: Link,
    ) -> Self {
        if !board.accel.is_available() {
            log::warn!("accelerometer unavailable; continuing in SOS-only mode");
        }

        let clock = DeviceClock::new(clock);
        let now = clock.now();

        Self {
            board,
            link,
            clock,
            identity,
            classifier: ImpactClassifier::new(config.impact_threshold),
            monitor: FallMonitor::new(config.settle_delay.as_millis() as u64),
            impacts: ImpactLog::new(),
            scheduler: ReportScheduler::new(
                config.heartbeat_interval.as_millis() as u64,
                config.liveness_interval.as_millis() as u64,
                now,
            ),
            poll_interval: config.poll_interval,
        }
    }

    /// Device identity
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Phase of the fall confirmation sequence
    pub fn fall_phase(&self) -> FallPhase {
        self.monitor.phase()
    }

    /// One cooperative tick
    pub fn service(&mut self) {
        let now = self.clock.now();

        // SOS has absolute priority over everything else in the tick.
        if self.board.button.is_pressed() {
            log::warn!("SOS button pressed");
            self.board.display.show(Icon::Sos);
            self.board.vibration.pulse(FEEDBACK_PULSE_MS);
            self.emit(ReportTrigger::Sos, now);
        }

        // Fall pipeline. Suppressed entirely while the sensor is absent:
        // classification of fabricated zero samples proves nothing.
        if self.board.accel.is_available() {
            let sample = self.board.accel.read();
            let c = self.classifier.classify(&sample);

            if c.is_impact {
                self.impacts.record(c.magnitude);

                if self.monitor.on_impact(c.magnitude) {
                    log::info!(
                        "impact {:.2} m/s2; opening confirmation window",
                        c.magnitude
                    );
                } else {
                    log::debug!(
                        "impact {:.2} m/s2 recorded during an open window",
                        c.magnitude
                    );
                }
            }
        }

        // Tilt is sampled once per tick; the confirmation check and the
        // indicator LED share the reading.
        let inclined = self.board.tilt.is_inclined();
        self.board.led.set(inclined);

        if let Some(verdict) = self.monitor.poll(now, || inclined) {
            match verdict {
                FallVerdict::Confirmed { magnitude } => {
                    log::warn!("fall confirmed ({:.2} m/s2)", magnitude);
                    self.board.display.show(Icon::Fall);
                    self.board.vibration.pulse(FEEDBACK_PULSE_MS);
                    self.emit(ReportTrigger::FallConfirmed, now);
                }
                FallVerdict::Rejected { magnitude } => {
                    // Magnitude stays in the log for the next heartbeat
                    log::debug!("impact {:.2} m/s2 rejected; device upright", magnitude);
                    self.board.display.show(Icon::Ok);
                }
            }
        }

        if self.scheduler.heartbeat_due(now) {
            self.emit(ReportTrigger::Heartbeat, now);
        }

        if self.scheduler.liveness_due(now) {
            if let Err(e) = self.link.pulse() {
                log::debug!("liveness pulse dropped: {}", e);
            }
            self.scheduler.mark_pulsed(now);
        }

        // May block through reconnection; see module docs.
        self.link.maintain();
    }

    /// Emit one report for `trigger`
    ///
    /// The impact log drains before the publish attempt and stays drained
    /// whatever the outcome: delivery is at-most-once, bounded memory wins
    /// over durability.
    fn emit(&mut self, trigger: ReportTrigger, now: Timestamp) {
        let drained = self.impacts.drain_and_reset();
        let report = Report::new(
            self.identity.as_str(),
            trigger,
            self.clock.timestamp_string(),
            drained,
        );

        match self.link.publish(&report) {
            Ok(()) => log::info!(
                "report published ({:?}, {} impacts)",
                trigger,
                report.impact_count
            ),
            Err(e) => log::warn!("report dropped ({:?}): {}", trigger, e),
        }

        self.scheduler.mark_reported(now);
    }

    /// Run the polling loop until the token is cancelled
    pub fn run(&mut self, cancel: &CancelToken) {
        log::info!("stepguard {} starting as {}", crate::VERSION, self.identity);
        self.board.display.show(Icon::Ok);

        while !cancel.is_cancelled() {
            self.service();
            std::thread::sleep(self.poll_interval);
        }

        self.board.display.clear();
        log::info!("supervisor stopped");
    }
}
