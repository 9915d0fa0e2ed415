//! End-to-end tests for the detection-and-reporting pipeline
//!
//! Drives a full `Device` against scripted peripherals, a manually advanced
//! wall clock, and a recording report link. No hardware, no broker, no
//! sleeping: time moves only when a test advances it.

#![cfg(feature = "std")]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use stepguard_core::hal::{Accelerometer, Board, SosButton, TiltSwitch};
use stepguard_core::{
    AccelSample, CancelToken, Device, DeviceConfig, DeviceIdentity, FallPhase, Report, ReportLink,
    TimeSource, Timestamp,
};

/// 2024-05-01 12:00:00 UTC in epoch milliseconds
const BASE_MS: u64 = 1_714_564_800_000;

const SETTLE_MS: u64 = 1500;
const HEARTBEAT_MS: u64 = 120_000;

#[derive(Clone)]
struct TestClock(Rc<Cell<u64>>);

impl TimeSource for TestClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

struct ScriptedAccel {
    samples: Rc<RefCell<VecDeque<AccelSample>>>,
    available: bool,
}

impl Accelerometer for ScriptedAccel {
    fn is_available(&self) -> bool {
        self.available
    }

    fn read(&mut self) -> AccelSample {
        // Resting orientation between scripted samples
        self.samples
            .borrow_mut()
            .pop_front()
            .unwrap_or(AccelSample::new(0.0, 0.0, 9.8))
    }
}

struct SharedTilt(Rc<Cell<bool>>);

impl TiltSwitch for SharedTilt {
    fn is_inclined(&mut self) -> bool {
        self.0.get()
    }
}

/// One-shot button: each stored press reads back exactly once
struct SharedButton(Rc<Cell<bool>>);

impl SosButton for SharedButton {
    fn is_pressed(&mut self) -> bool {
        self.0.replace(false)
    }
}

#[derive(Debug)]
struct LinkDown;

impl fmt::Display for LinkDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("link down")
    }
}

struct RecordingLink {
    reports: Rc<RefCell<Vec<Report>>>,
    pulses: Rc<Cell<u32>>,
    fail: Rc<Cell<bool>>,
}

impl ReportLink for RecordingLink {
    type Error = LinkDown;

    fn maintain(&mut self) {}

    fn publish(&mut self, report: &Report) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(LinkDown);
        }
        self.reports.borrow_mut().push(report.clone());
        Ok(())
    }

    fn pulse(&mut self) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(LinkDown);
        }
        self.pulses.set(self.pulses.get() + 1);
        Ok(())
    }
}

struct Harness {
    clock: Rc<Cell<u64>>,
    tilt: Rc<Cell<bool>>,
    button: Rc<Cell<bool>>,
    samples: Rc<RefCell<VecDeque<AccelSample>>>,
    reports: Rc<RefCell<Vec<Report>>>,
    pulses: Rc<Cell<u32>>,
    fail: Rc<Cell<bool>>,
    device: Device<ScriptedAccel, SharedTilt, SharedButton, (), (), (), RecordingLink, TestClock>,
}

impl Harness {
    fn new(accel_available: bool) -> Self {
        Self::with_liveness(accel_available, Duration::from_secs(3600))
    }

    fn with_liveness(accel_available: bool, liveness: Duration) -> Self {
        let config = DeviceConfig::default()
            .impact_threshold(30.0)
            .settle_delay(Duration::from_millis(SETTLE_MS))
            .heartbeat_interval(Duration::from_millis(HEARTBEAT_MS))
            .liveness_interval(liveness);

        let clock = Rc::new(Cell::new(BASE_MS));
        let tilt = Rc::new(Cell::new(false));
        let button = Rc::new(Cell::new(false));
        let samples = Rc::new(RefCell::new(VecDeque::new()));
        let reports = Rc::new(RefCell::new(Vec::new()));
        let pulses = Rc::new(Cell::new(0));
        let fail = Rc::new(Cell::new(false));

        let board = Board {
            accel: ScriptedAccel {
                samples: Rc::clone(&samples),
                available: accel_available,
            },
            tilt: SharedTilt(Rc::clone(&tilt)),
            button: SharedButton(Rc::clone(&button)),
            led: (),
            vibration: (),
            display: (),
        };

        let link = RecordingLink {
            reports: Rc::clone(&reports),
            pulses: Rc::clone(&pulses),
            fail: Rc::clone(&fail),
        };

        let device = Device::new(
            &config,
            DeviceIdentity::from_seed([0xA4, 0xCF, 0x12, 0x9B, 0x20, 0x01]),
            board,
            TestClock(Rc::clone(&clock)),
            link,
        );

        Self {
            clock,
            tilt,
            button,
            samples,
            reports,
            pulses,
            fail,
            device,
        }
    }

    fn elapsed(&self) -> u64 {
        self.clock.get() - BASE_MS
    }

    fn advance_to(&mut self, offset_ms: u64) {
        assert!(offset_ms >= self.elapsed());
        self.clock.set(BASE_MS + offset_ms);
    }

    fn queue_impact(&mut self) {
        // Magnitude ≈ 34.64 against the 30.0 threshold
        self.samples
            .borrow_mut()
            .push_back(AccelSample::new(20.0, 20.0, 20.0));
    }

    fn reports(&self) -> Vec<Report> {
        self.reports.borrow().clone()
    }
}

#[test]
fn confirmed_fall_emits_exactly_one_report() {
    let mut h = Harness::new(true);
    h.tilt.set(true);
    h.queue_impact();

    // Impact tick: recorded, confirmation window opens
    h.device.service();
    assert!(h.reports().is_empty());

    // Mid-window: nothing resolves
    h.advance_to(1000);
    h.device.service();
    assert!(h.reports().is_empty());

    // Deadline reached: tilt confirms, report goes out
    h.advance_to(SETTLE_MS);
    h.device.service();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert!(report.fall_detected);
    assert!(!report.button_pressed);
    assert_eq!(report.device_id, "A4:CF:12:9B:20:01");
    assert_eq!(report.impact_count, 1);
    assert_eq!(report.impact_magnitudes.len(), 1);
    assert!((report.impact_magnitudes[0] - 34.64).abs() < 0.01);
    assert!(report.timestamp.starts_with("2024-05-01"));

    // Monitor is back to idle, nothing else fires
    assert_eq!(h.device.fall_phase(), FallPhase::Idle);
    h.advance_to(SETTLE_MS + 100);
    h.device.service();
    assert_eq!(h.reports().len(), 1);
}

#[test]
fn rejected_impact_surfaces_in_next_heartbeat() {
    let mut h = Harness::new(true);
    h.tilt.set(false);
    h.queue_impact();

    h.device.service();
    h.advance_to(SETTLE_MS);
    h.device.service();

    // Upright at the tilt check: no immediate report
    assert!(h.reports().is_empty());
    assert_eq!(h.device.fall_phase(), FallPhase::Idle);

    // The magnitude still reaches the backend with the heartbeat
    h.advance_to(HEARTBEAT_MS);
    h.device.service();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].fall_detected);
    assert!(!reports[0].button_pressed);
    assert_eq!(reports[0].impact_count, 1);
    assert!((reports[0].impact_magnitudes[0] - 34.64).abs() < 0.01);
}

#[test]
fn sos_reports_immediately_with_empty_buffer() {
    let mut h = Harness::new(true);

    h.advance_to(5000);
    h.button.set(true);
    h.device.service();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].button_pressed);
    assert!(!reports[0].fall_detected);
    assert_eq!(reports[0].impact_count, 0);
    assert!(reports[0].impact_magnitudes.is_empty());
}

#[test]
fn any_report_resets_the_heartbeat_baseline() {
    let mut h = Harness::new(true);

    // SOS at T = 5s
    h.advance_to(5000);
    h.button.set(true);
    h.device.service();
    assert_eq!(h.reports().len(), 1);

    // The originally scheduled heartbeat at T = 120s does not fire
    h.advance_to(HEARTBEAT_MS);
    h.device.service();
    assert_eq!(h.reports().len(), 1);

    // It fires a full interval after the SOS report instead
    h.advance_to(5000 + HEARTBEAT_MS);
    h.device.service();
    assert_eq!(h.reports().len(), 2);
    assert!(!h.reports()[1].button_pressed);
}

#[test]
fn failed_publish_still_drains_the_buffer() {
    let mut h = Harness::new(true);
    h.queue_impact();
    h.device.service();

    // Let the window resolve as rejected so the magnitude stays buffered
    h.advance_to(SETTLE_MS);
    h.device.service();

    // Heartbeat attempt against a dead link: no report recorded, no panic
    h.fail.set(true);
    h.advance_to(HEARTBEAT_MS);
    h.device.service();
    assert!(h.reports().is_empty());

    // Link recovers; the next heartbeat starts from a clean buffer
    h.fail.set(false);
    h.advance_to(2 * HEARTBEAT_MS);
    h.device.service();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].impact_count, 0);
    assert!(reports[0].impact_magnitudes.is_empty());
}

#[test]
fn impacts_during_open_window_buffer_without_restarting() {
    let mut h = Harness::new(true);
    h.tilt.set(true);
    h.queue_impact();
    h.device.service();

    // Second impact 100 ms into the window
    h.advance_to(100);
    h.queue_impact();
    h.device.service();

    // Verdict lands at the original deadline, not 100 ms later
    h.advance_to(SETTLE_MS);
    h.device.service();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].fall_detected);
    assert_eq!(reports[0].impact_count, 2);
    assert_eq!(reports[0].impact_magnitudes.len(), 2);
}

#[test]
fn unavailable_sensor_degrades_to_sos_only() {
    let mut h = Harness::new(false);
    h.queue_impact();

    h.device.service();
    h.advance_to(SETTLE_MS + 100);
    h.device.service();

    // No confirmation sequence ever opened
    assert_eq!(h.device.fall_phase(), FallPhase::Idle);

    // Heartbeat reports zero impacts
    h.advance_to(HEARTBEAT_MS);
    h.device.service();
    assert_eq!(h.reports().len(), 1);
    assert_eq!(h.reports()[0].impact_count, 0);

    // SOS still works
    h.button.set(true);
    h.advance_to(HEARTBEAT_MS + 1000);
    h.device.service();
    assert_eq!(h.reports().len(), 2);
    assert!(h.reports()[1].button_pressed);
}

#[test]
fn liveness_pulses_on_their_own_interval() {
    let mut h = Harness::with_liveness(true, Duration::from_secs(1));

    h.advance_to(1000);
    h.device.service();
    assert_eq!(h.pulses.get(), 1);

    // Not due again immediately
    h.advance_to(1500);
    h.device.service();
    assert_eq!(h.pulses.get(), 1);

    h.advance_to(2000);
    h.device.service();
    assert_eq!(h.pulses.get(), 2);
}

#[test]
fn cancel_token_stops_the_run_loop() {
    let mut h = Harness::new(true);
    let cancel = CancelToken::new();
    cancel.cancel();

    // Already-cancelled token: run returns without a single tick
    h.device.run(&cancel);
    assert!(h.reports().is_empty());
}
