//! # Two-Wire Bus
//!
//! Register-addressed access to devices on a two-wire (I2C) bus.
//!
//! A register write sends the register address byte followed by the payload
//! in one transfer. A register read writes the register address (without a
//! stop condition) and then reads a length-bounded block. Each failing phase
//! is reported to the alarm collaborator under its own [`FaultKind`].

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::alarm::{Alarm, FaultKind};

/// Errors reported by a bus implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The addressed device did not acknowledge
    #[error("no acknowledge from device 0x{0:02X}")]
    Nack(u8),

    /// Bus arbitration lost or other transfer failure
    #[error("transfer to device 0x{0:02X} failed")]
    Transfer(u8),
}

/// Raw two-wire bus transfers
pub trait TwoWireBus: Send {
    /// Write `bytes` to the device at `address`; `repeated_start` keeps the bus
    /// claimed for a following read
    fn write(&mut self, address: u8, bytes: &[u8], repeated_start: bool) -> Result<(), BusError>;

    /// Fill `buffer` from the device at `address`
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), BusError>;
}

/// Register-addressed view of one bus device
pub struct BusDevice {
    address: u8,
    alarm: Arc<dyn Alarm>,
}

impl std::fmt::Debug for BusDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusDevice")
            .field("address", &format_args!("0x{:02X}", self.address))
            .finish_non_exhaustive()
    }
}

impl BusDevice {
    #[must_use]
    pub fn new(address: u8, alarm: Arc<dyn Alarm>) -> Self {
        Self { address, alarm }
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Write `data` starting at register `register`
    ///
    /// # Errors
    ///
    /// Returns the bus error after raising [`FaultKind::BusWrite`]
    pub fn write_register<B: TwoWireBus + ?Sized>(
        &self,
        bus: &mut B,
        register: u8,
        data: &[u8],
    ) -> Result<(), BusError> {
        let mut frame = Vec::with_capacity(1 + data.len());
        frame.push(register);
        frame.extend_from_slice(data);

        bus.write(self.address, &frame, false).map_err(|e| {
            debug!("Write to 0x{:02X} register 0x{:02X} failed: {}", self.address, register, e);
            self.alarm.set(FaultKind::BusWrite);
            e
        })
    }

    /// Read `length` bytes starting at register `register`
    ///
    /// # Errors
    ///
    /// Returns the bus error after raising [`FaultKind::BusWriteBeforeRead`] or
    /// [`FaultKind::BusReadAfterWrite`], depending on the failing phase
    pub fn read_registers<B: TwoWireBus + ?Sized>(
        &self,
        bus: &mut B,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, BusError> {
        bus.write(self.address, &[register], true).map_err(|e| {
            debug!("Address write to 0x{:02X} register 0x{:02X} failed: {}", self.address, register, e);
            self.alarm.set(FaultKind::BusWriteBeforeRead);
            e
        })?;

        let mut data = vec![0u8; length];
        bus.read(self.address, &mut data).map_err(|e| {
            debug!("Read from 0x{:02X} register 0x{:02X} failed: {}", self.address, register, e);
            self.alarm.set(FaultKind::BusReadAfterWrite);
            e
        })?;

        Ok(data)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;

    /// One recorded bus transfer
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Transfer {
        Write { address: u8, bytes: Vec<u8>, repeated_start: bool },
        Read { address: u8, length: usize },
    }

    /// Scripted bus for testing
    #[derive(Debug, Default)]
    pub struct ScriptedBus {
        pub transfers: Vec<Transfer>,
        pub read_data: VecDeque<Vec<u8>>,
        pub fail_writes: bool,
        pub fail_reads: bool,
    }

    impl TwoWireBus for ScriptedBus {
        fn write(&mut self, address: u8, bytes: &[u8], repeated_start: bool) -> Result<(), BusError> {
            self.transfers.push(Transfer::Write { address, bytes: bytes.to_vec(), repeated_start });
            if self.fail_writes {
                Err(BusError::Nack(address))
            } else {
                Ok(())
            }
        }

        fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), BusError> {
            self.transfers.push(Transfer::Read { address, length: buffer.len() });
            if self.fail_reads {
                return Err(BusError::Transfer(address));
            }
            if let Some(data) = self.read_data.pop_front() {
                let n = data.len().min(buffer.len());
                buffer[..n].copy_from_slice(&data[..n]);
            }
            Ok(())
        }
    }
}
