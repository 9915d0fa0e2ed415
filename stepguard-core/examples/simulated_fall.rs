//! Simulated fall against a stdout report link
//!
//! Runs the full pipeline with scripted sensors: two seconds of rest, one
//! hard impact, tilt engaged. Prints every payload the device would publish.
//!
//! ```text
//! cargo run --example simulated_fall
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use stepguard_core::hal::{Accelerometer, Board, SosButton, TiltSwitch};
use stepguard_core::{
    AccelSample, Device, DeviceConfig, DeviceIdentity, Report, ReportLink, TimeSource, Timestamp,
};

#[derive(Clone)]
struct ScriptClock(Rc<Cell<u64>>);

impl TimeSource for ScriptClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

struct ScriptedAccel {
    clock: ScriptClock,
}

impl Accelerometer for ScriptedAccel {
    fn is_available(&self) -> bool {
        true
    }

    fn read(&mut self) -> AccelSample {
        // One hard impact at T = 2s, rest everywhere else
        if self.clock.now() / 100 == 20 {
            AccelSample::new(20.0, 20.0, 20.0)
        } else {
            AccelSample::new(0.0, 0.0, 9.8)
        }
    }
}

struct FloorTilt {
    clock: ScriptClock,
}

impl TiltSwitch for FloorTilt {
    fn is_inclined(&mut self) -> bool {
        // The wearer is down from the impact onwards
        self.clock.now() >= 2000
    }
}

struct NoButton;

impl SosButton for NoButton {
    fn is_pressed(&mut self) -> bool {
        false
    }
}

struct StdoutLink;

impl ReportLink for StdoutLink {
    type Error = stepguard_core::ReportError;

    fn maintain(&mut self) {}

    fn publish(&mut self, report: &Report) -> Result<(), Self::Error> {
        println!("publish -> {}", report.to_json()?);
        Ok(())
    }

    fn pulse(&mut self) -> Result<(), Self::Error> {
        println!("pulse   -> online");
        Ok(())
    }
}

fn main() {
    let config = DeviceConfig::default()
        .impact_threshold(30.0)
        .heartbeat_interval(Duration::from_secs(10))
        .liveness_interval(Duration::from_secs(5));

    let clock = Rc::new(Cell::new(0u64));
    let script = ScriptClock(Rc::clone(&clock));

    let board = Board {
        accel: ScriptedAccel {
            clock: script.clone(),
        },
        tilt: FloorTilt {
            clock: script.clone(),
        },
        button: NoButton,
        led: (),
        vibration: (),
        display: (),
    };

    let mut device = Device::new(
        &config,
        DeviceIdentity::from_seed([0xA4, 0xCF, 0x12, 0x9B, 0x20, 0x01]),
        board,
        script,
        StdoutLink,
    );

    // Fifteen simulated seconds at a 100 ms tick
    for tick in 0..150u64 {
        clock.set(tick * 100);
        device.service();
    }
}
