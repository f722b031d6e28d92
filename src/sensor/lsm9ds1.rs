//! # LSM9DS1 Driver
//!
//! Gyroscope/accelerometer and magnetometer access for the LSM9DS1 IMU.
//!
//! ## Configuration
//!
//! | Device | Register | Value | Meaning |
//! |--------|----------|-------|---------|
//! | AG | CTRL_REG1_G (0x10) | 0x68 | 119 Hz, 500 deg/s |
//! | AG | CTRL_REG6_XL (0x20) | 0x60 | 119 Hz, +/-2 g |
//! | AG | INT1_CTRL (0x0C) | 0x02 | gyro data-ready on INT1 |
//! | M | CTRL_REG1_M (0x20) | 0xFC | temp comp, ultra-high XY, 80 Hz |
//! | M | CTRL_REG2_M (0x21) | 0x60 | +/-16 gauss |
//! | M | CTRL_REG3_M (0x22) | 0x00 | continuous conversion |

use std::sync::Arc;
use tracing::{debug, info};

use super::bus::{BusDevice, BusError, TwoWireBus};
use super::{MotionSensor, RawImuSample};
use crate::alarm::Alarm;

/// 7-bit address of the gyroscope/accelerometer
pub const AG_ADDRESS: u8 = 0x6B;
/// 7-bit address of the magnetometer
pub const M_ADDRESS: u8 = 0x1E;

/// Gyroscope/accelerometer registers
pub mod ag_reg {
    pub const INT1_CTRL: u8 = 0x0C;
    pub const CTRL_REG1_G: u8 = 0x10;
    pub const OUT_X_L_G: u8 = 0x18;
    pub const CTRL_REG6_XL: u8 = 0x20;
    pub const OUT_X_L_XL: u8 = 0x28;
}

/// Magnetometer registers
pub mod m_reg {
    pub const CTRL_REG1_M: u8 = 0x20;
    pub const CTRL_REG2_M: u8 = 0x21;
    pub const CTRL_REG3_M: u8 = 0x22;
    pub const OUT_X_L_M: u8 = 0x28;
}

/// Decodes three little-endian `i16` values
fn decode_triple(bytes: &[u8]) -> [i16; 3] {
    let mut out = [0i16; 3];
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        *value = i16::from_le_bytes([chunk[0], chunk[1]]);
    }
    out
}

/// LSM9DS1 on a two-wire bus
pub struct Lsm9ds1<B: TwoWireBus> {
    bus: B,
    gyro_accel: BusDevice,
    magnetometer: BusDevice,
    last: RawImuSample,
}

impl<B: TwoWireBus> std::fmt::Debug for Lsm9ds1<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lsm9ds1")
            .field("gyro_accel", &self.gyro_accel)
            .field("magnetometer", &self.magnetometer)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl<B: TwoWireBus> Lsm9ds1<B> {
    /// Creates the driver without touching the bus
    pub fn new(bus: B, alarm: Arc<dyn Alarm>) -> Self {
        Self {
            bus,
            gyro_accel: BusDevice::new(AG_ADDRESS, Arc::clone(&alarm)),
            magnetometer: BusDevice::new(M_ADDRESS, alarm),
            last: RawImuSample::default(),
        }
    }

    /// Writes the sampling configuration to both devices
    ///
    /// # Errors
    ///
    /// Returns the first bus error; every failing write has raised an alarm
    pub fn init(&mut self) -> Result<(), BusError> {
        let writes = [
            (&self.gyro_accel, ag_reg::CTRL_REG1_G, 0x68),
            (&self.gyro_accel, ag_reg::CTRL_REG6_XL, 0x60),
            (&self.gyro_accel, ag_reg::INT1_CTRL, 0x02),
            (&self.magnetometer, m_reg::CTRL_REG1_M, 0xFC),
            (&self.magnetometer, m_reg::CTRL_REG2_M, 0x60),
            (&self.magnetometer, m_reg::CTRL_REG3_M, 0x00),
        ];

        let mut result = Ok(());
        for (device, register, value) in writes {
            if let Err(e) = device.write_register(&mut self.bus, register, &[value]) {
                result = result.and(Err(e));
            }
        }

        if result.is_ok() {
            info!("LSM9DS1 configured (119 Hz, 500 dps, 2 g, 16 gauss)");
        }
        result
    }

    /// Reads all three output blocks
    ///
    /// # Errors
    ///
    /// Returns the first failing transfer; earlier blocks are discarded
    pub fn read(&mut self) -> Result<RawImuSample, BusError> {
        let gyro = self.gyro_accel.read_registers(&mut self.bus, ag_reg::OUT_X_L_G, 6)?;
        let accel = self.gyro_accel.read_registers(&mut self.bus, ag_reg::OUT_X_L_XL, 6)?;
        let mag = self.magnetometer.read_registers(&mut self.bus, m_reg::OUT_X_L_M, 6)?;

        Ok(RawImuSample {
            gyroscope: decode_triple(&gyro),
            accelerometer: decode_triple(&accel),
            magnetometer: decode_triple(&mag),
        })
    }

    /// Last successfully read sample
    pub fn last_sample(&self) -> RawImuSample {
        self.last
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

impl<B: TwoWireBus> MotionSensor for Lsm9ds1<B> {
    fn sample(&mut self) -> RawImuSample {
        match self.read() {
            Ok(sample) => self.last = sample,
            Err(e) => debug!("IMU read failed, reusing previous sample: {}", e),
        }
        self.last
    }
}
