//! # Yoke Pipeline
//!
//! The periodic control handler: one cycle reads the sensor and the panel,
//! updates the orientation estimate, maps everything to a report and hands
//! the report to the transport.
//!
//! ## Cycle
//!
//! 1. On [`Trigger::Watchdog`] the sensor read is skipped and
//!    [`FaultKind::NoInterrupt`] is raised; the previous sample is reused.
//! 2. The panel is read and the switch bank debounced; encoder steps are
//!    forwarded to the menu queue.
//! 3. The estimator runs on the (fresh or stale) sample.
//! 4. The mapper builds the report, widening the throttle range while a
//!    calibration session is active.
//!
//! Nothing in a cycle blocks or fails: faults degrade freshness, never the
//! report cadence.

use async_trait::async_trait;
use std::f32::consts::{PI, TAU};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use crate::alarm::{Alarm, FaultKind};
use crate::config::Config;
use crate::control::calibration::{CalibrationOutcome, CalibrationRange};
use crate::control::mapper::ControlMapper;
use crate::control::report::ControlReport;
use crate::fusion::{OrientationEstimator, OrientationSnapshot, References};
use crate::input::rotary::Direction;
use crate::input::switch::{SwitchBank, SwitchEvent};
use crate::input::InputPanel;
use crate::scheduler::{Command, CycleHandler, Trigger};
use crate::sensor::{MotionSensor, RawImuSample};
use crate::storage::{
    Storage, KEY_PITCH_REFERENCE, KEY_ROLL_REFERENCE, KEY_THROTTLE_MAX, KEY_THROTTLE_MIN, KEY_YAW_REFERENCE,
};
use crate::telemetry::{TelemetryRecord, TelemetrySender};
use crate::transport::ReportTransport;

/// Cycles between status log lines
const STATUS_INTERVAL_CYCLES: u64 = 1000;

/// The control pipeline and its collaborators
pub struct Yoke {
    sensor: Box<dyn MotionSensor>,
    panel: Box<dyn InputPanel>,
    transport: Box<dyn ReportTransport>,
    storage: Box<dyn Storage>,
    alarm: Arc<dyn Alarm>,
    estimator: OrientationEstimator,
    switches: SwitchBank,
    mapper: ControlMapper,
    sample: RawImuSample,
    sample_period: Duration,
    clock: Duration,
    last_cycle: Option<Instant>,
    cycles: u64,
    send_failures: u64,
    last_report: ControlReport,
    last_orientation: OrientationSnapshot,
    menu: Option<mpsc::Sender<Direction>>,
    telemetry: Option<(TelemetrySender, u64)>,
}

impl std::fmt::Debug for Yoke {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Yoke")
            .field("cycles", &self.cycles)
            .field("calibrating", &self.mapper.is_calibrating())
            .field("last_report", &self.last_report)
            .finish_non_exhaustive()
    }
}

impl Yoke {
    /// Builds the pipeline, restoring calibration parameters from `storage`
    pub fn new(
        config: &Config,
        sensor: Box<dyn MotionSensor>,
        panel: Box<dyn InputPanel>,
        transport: Box<dyn ReportTransport>,
        mut storage: Box<dyn Storage>,
        alarm: Arc<dyn Alarm>,
    ) -> Self {
        let throttle_range = CalibrationRange::restore(storage.as_mut(), KEY_THROTTLE_MIN, KEY_THROTTLE_MAX);
        let references = References {
            pitch: storage.restore(KEY_PITCH_REFERENCE, 0.0, -PI, PI),
            roll: storage.restore(KEY_ROLL_REFERENCE, 0.0, -PI, PI),
            yaw: storage.restore(KEY_YAW_REFERENCE, 0.0, -TAU, TAU),
        };
        info!(
            "Restored throttle range {:.3}..{:.3}",
            throttle_range.min(),
            throttle_range.max()
        );

        let mut estimator = OrientationEstimator::new(&config.fusion);
        estimator.set_references(references);

        Self {
            sensor,
            panel,
            transport,
            storage,
            alarm,
            estimator,
            switches: SwitchBank::new(Duration::from_millis(config.controls.debounce_ms)),
            mapper: ControlMapper::new(&config.controls, throttle_range),
            sample: RawImuSample::default(),
            sample_period: config.imu.sample_period(),
            clock: Duration::ZERO,
            last_cycle: None,
            cycles: 0,
            send_failures: 0,
            last_report: ControlReport::default(),
            last_orientation: OrientationSnapshot::default(),
            menu: None,
            telemetry: None,
        }
    }

    /// Forwards encoder steps to the menu collaborator
    #[must_use]
    pub fn with_menu(mut self, menu: mpsc::Sender<Direction>) -> Self {
        self.menu = Some(menu);
        self
    }

    /// Offers a telemetry record every `every_cycles` cycles
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetrySender, every_cycles: u64) -> Self {
        self.telemetry = Some((telemetry, every_cycles.max(1)));
        self
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn last_report(&self) -> ControlReport {
        self.last_report
    }

    #[must_use]
    pub fn orientation(&self) -> OrientationSnapshot {
        self.last_orientation
    }

    #[must_use]
    pub fn is_calibrating(&self) -> bool {
        self.mapper.is_calibrating()
    }

    #[must_use]
    pub fn throttle_range(&self) -> CalibrationRange {
        self.mapper.throttle_range()
    }

    /// Reports the transport refused so far
    #[must_use]
    pub fn send_failures(&self) -> u64 {
        self.send_failures
    }

    /// Runs one cycle `dt` seconds after the previous one and returns its report
    ///
    /// A non-finite or negative `dt` counts as zero elapsed time.
    pub fn cycle(&mut self, trigger: Trigger, dt: f32) -> ControlReport {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.cycles += 1;
        self.clock += Duration::from_secs_f32(dt);

        match trigger {
            Trigger::DataReady => self.sample = self.sensor.sample(),
            Trigger::Watchdog => self.alarm.set(FaultKind::NoInterrupt),
        }

        let panel = self.panel.read();
        for event in self.switches.update(&panel, self.clock) {
            if let SwitchEvent::Encoder(direction) = event {
                self.forward_to_menu(direction);
            }
        }

        let orientation = self.estimator.update(&self.sample.to_reading(), dt);
        let report = self.mapper.map(&orientation, &panel, &self.switches);

        if let Some((telemetry, every)) = &self.telemetry {
            if self.cycles % every == 0 {
                telemetry.offer(TelemetryRecord {
                    cycle: self.cycles,
                    watchdog: trigger == Trigger::Watchdog,
                    orientation,
                    report,
                });
            }
        }

        if self.cycles % STATUS_INTERVAL_CYCLES == 0 {
            debug!(
                "Cycle {}: pitch={:.3} roll={:.3} yaw={:.3} calibrated={}",
                self.cycles, orientation.pitch, orientation.roll, orientation.yaw, orientation.calibrated
            );
        }

        self.last_orientation = orientation;
        self.last_report = report;
        report
    }

    fn forward_to_menu(&self, direction: Direction) {
        if let Some(menu) = &self.menu {
            if menu.try_send(direction).is_err() {
                trace!("Menu queue unavailable, encoder step dropped");
            }
        }
    }

    /// Executes a calibration command
    pub fn command(&mut self, command: Command) {
        match command {
            Command::StartCalibration => self.mapper.start_calibration(),
            Command::StopCalibration => self.finish_calibration(),
            Command::ToggleCalibration => {
                if self.mapper.is_calibrating() {
                    self.finish_calibration();
                } else {
                    self.mapper.start_calibration();
                }
            }
        }
    }

    fn finish_calibration(&mut self) {
        let Some(outcome) = self.mapper.stop_calibration() else {
            debug!("Stop calibration ignored, no session active");
            return;
        };
        if let CalibrationOutcome::Applied(range) = outcome {
            info!("Throttle range set to {:.3}..{:.3}", range.min(), range.max());
        }

        let range = self.mapper.throttle_range();
        if let Err(e) = range.persist(self.storage.as_mut(), KEY_THROTTLE_MIN, KEY_THROTTLE_MAX) {
            error!("Failed to store throttle range: {}", e);
        }

        let references = self.estimator.references();
        for (key, value) in [
            (KEY_PITCH_REFERENCE, references.pitch),
            (KEY_ROLL_REFERENCE, references.roll),
            (KEY_YAW_REFERENCE, references.yaw),
        ] {
            if let Err(e) = self.storage.store(key, value) {
                error!("Failed to store {}: {}", key, e);
            }
        }
    }
}

#[async_trait]
impl CycleHandler for Yoke {
    async fn on_cycle(&mut self, trigger: Trigger) {
        let now = Instant::now();
        let dt = match self.last_cycle.replace(now) {
            Some(previous) => now.duration_since(previous),
            None => self.sample_period,
        };

        let report = self.cycle(trigger, dt.as_secs_f32());
        if !self.transport.send_report(&report).await {
            self.send_failures += 1;
        }
    }

    async fn on_command(&mut self, command: Command) {
        self.command(command);
    }
}
