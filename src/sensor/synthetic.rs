//! # Synthetic Sensor Bus
//!
//! A [`TwoWireBus`] that answers LSM9DS1 register reads from scripted samples.
//!
//! Used when the controller runs on a host without inertial hardware and to
//! drive the pipeline deterministically in tests. A new sample is taken each
//! time the gyroscope output block is addressed, i.e. once per sensor read.
//! When the script runs dry the optional generator supplies samples; without
//! one the last sample is held (the device is at rest).

use std::collections::VecDeque;

use super::bus::{BusError, TwoWireBus};
use super::lsm9ds1::{ag_reg, m_reg, AG_ADDRESS, M_ADDRESS};
use super::{RawImuSample, Vector3};

type Generator = Box<dyn FnMut(u64) -> RawImuSample + Send>;

/// Scripted LSM9DS1 register bank
pub struct SyntheticBus {
    script: VecDeque<RawImuSample>,
    generator: Option<Generator>,
    current: RawImuSample,
    samples_served: u64,
    selected: Option<(u8, u8)>,
    /// Number of upcoming transfers that fail
    pub fail_next: usize,
}

impl std::fmt::Debug for SyntheticBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticBus")
            .field("queued", &self.script.len())
            .field("samples_served", &self.samples_served)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl Default for SyntheticBus {
    fn default() -> Self {
        Self::at_rest()
    }
}

impl SyntheticBus {
    /// A level, motionless sensor
    #[must_use]
    pub fn at_rest() -> Self {
        Self {
            script: VecDeque::new(),
            generator: None,
            current: RawImuSample::from_motion(Vector3::default(), 0.0, 0.0, 0.0),
            samples_served: 0,
            selected: None,
            fail_next: 0,
        }
    }

    /// A sensor whose samples come from `generator(sample_index)` once the script is empty
    #[must_use]
    pub fn with_generator<F>(generator: F) -> Self
    where
        F: FnMut(u64) -> RawImuSample + Send + 'static,
    {
        Self {
            generator: Some(Box::new(generator)),
            ..Self::at_rest()
        }
    }

    /// Slow pitch/roll sway, as produced by a pilot gently working the yoke
    ///
    /// `period_s` is the sampling period; the sway has a 10 s cycle and
    /// 0.3 rad amplitude on pitch, 0.2 rad on roll.
    #[must_use]
    pub fn sway(period_s: f32) -> Self {
        Self::with_generator(move |index| {
            let t = index as f32 * period_s;
            let w = std::f32::consts::TAU / 10.0;
            let pitch = 0.3 * (w * t).sin();
            let roll = 0.2 * (w * t).cos() - 0.2;
            let rate = Vector3::new(0.3 * w * (w * t).cos(), -0.2 * w * (w * t).sin(), 0.0);
            RawImuSample::from_motion(rate, pitch, roll, 0.0)
        })
    }

    /// Queue samples to be served in order
    pub fn push_samples<I: IntoIterator<Item = RawImuSample>>(&mut self, samples: I) {
        self.script.extend(samples);
    }

    /// Number of scripted samples not yet served
    #[must_use]
    pub fn queued(&self) -> usize {
        self.script.len()
    }

    /// Number of samples served so far
    #[must_use]
    pub fn samples_served(&self) -> u64 {
        self.samples_served
    }

    fn advance(&mut self) {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        } else if let Some(generator) = self.generator.as_mut() {
            self.current = generator(self.samples_served);
        }
        self.samples_served += 1;
    }

    fn check_fault(&mut self, address: u8) -> Result<(), BusError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            Err(BusError::Nack(address))
        } else {
            Ok(())
        }
    }
}

fn encode_triple(values: [i16; 3], buffer: &mut [u8]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let n = bytes.len().min(buffer.len());
    buffer[..n].copy_from_slice(&bytes[..n]);
}

impl TwoWireBus for SyntheticBus {
    fn write(&mut self, address: u8, bytes: &[u8], repeated_start: bool) -> Result<(), BusError> {
        self.check_fault(address)?;
        if repeated_start {
            if let Some(&register) = bytes.first() {
                if address == AG_ADDRESS && register == ag_reg::OUT_X_L_G {
                    self.advance();
                }
                self.selected = Some((address, register));
            }
        }
        Ok(())
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.check_fault(address)?;
        buffer.fill(0);
        match self.selected.take() {
            Some((AG_ADDRESS, ag_reg::OUT_X_L_G)) => encode_triple(self.current.gyroscope, buffer),
            Some((AG_ADDRESS, ag_reg::OUT_X_L_XL)) => encode_triple(self.current.accelerometer, buffer),
            Some((M_ADDRESS, m_reg::OUT_X_L_M)) => encode_triple(self.current.magnetometer, buffer),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmRegister;
    use crate::sensor::lsm9ds1::Lsm9ds1;
    use crate::sensor::MotionSensor;
    use std::sync::Arc;

    #[test]
    fn test_scripted_samples_served_in_order_then_held() {
        let mut bus = SyntheticBus::at_rest();
        let a = RawImuSample::from_motion(Vector3::new(0.1, 0.0, 0.0), 0.0, 0.0, 0.0);
        let b = RawImuSample::from_motion(Vector3::new(0.2, 0.0, 0.0), 0.1, 0.0, 0.0);
        bus.push_samples([a, b]);
        let mut imu = Lsm9ds1::new(bus, Arc::new(AlarmRegister::new()));

        assert_eq!(imu.sample(), a);
        assert_eq!(imu.sample(), b);
        assert_eq!(imu.sample(), b);
        assert_eq!(imu.bus().samples_served(), 3);
    }

    #[test]
    fn test_generator_fills_after_script() {
        let bus = SyntheticBus::with_generator(|index| RawImuSample {
            gyroscope: [index as i16, 0, 0],
            ..Default::default()
        });
        let mut imu = Lsm9ds1::new(bus, Arc::new(AlarmRegister::new()));

        assert_eq!(imu.sample().gyroscope[0], 0);
        assert_eq!(imu.sample().gyroscope[0], 1);
        assert_eq!(imu.sample().gyroscope[0], 2);
    }

    #[test]
    fn test_injected_fault_keeps_previous_sample() {
        let mut bus = SyntheticBus::at_rest();
        let moving = RawImuSample::from_motion(Vector3::new(0.5, 0.0, 0.0), 0.0, 0.0, 0.0);
        bus.push_samples([moving]);
        let alarm = Arc::new(AlarmRegister::new());
        let mut imu = Lsm9ds1::new(bus, alarm.clone());

        let first = imu.sample();
        assert_eq!(first, moving);
        imu.bus_mut().fail_next = 1;
        assert_eq!(imu.sample(), first);
        assert_eq!(alarm.count(crate::alarm::FaultKind::BusWriteBeforeRead), 1);
    }

    #[test]
    fn test_sway_starts_level() {
        let mut imu = Lsm9ds1::new(SyntheticBus::sway(0.01), Arc::new(AlarmRegister::new()));
        let reading = imu.sample().to_reading();
        assert!(reading.acceleration.y.abs() < 1e-3);
        assert!(reading.angular_rate.x > 0.0);
    }
}
