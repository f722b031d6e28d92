//! # Alarm Module
//!
//! Fault-flag registry consumed by the control pipeline.
//!
//! Faults are fire-and-forget: the pipeline raises a [`FaultKind`] and carries
//! on with stale-but-valid data. The register keeps a sticky bitmask (as shown
//! on the alarm LED / console) plus a per-kind occurrence counter.

use std::sync::atomic::{AtomicU32, Ordering};
use tracing::warn;

/// Kinds of fault the control pipeline can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FaultKind {
    /// Register write to a bus device failed
    BusWrite = 0,
    /// Address phase of a register read failed
    BusWriteBeforeRead = 1,
    /// Data phase of a register read failed
    BusReadAfterWrite = 2,
    /// The sensor data-ready interrupt did not arrive in time
    NoInterrupt = 3,
}

const FAULT_KINDS: usize = 4;

impl FaultKind {
    /// All fault kinds in bit order
    pub const ALL: [FaultKind; FAULT_KINDS] = [
        FaultKind::BusWrite,
        FaultKind::BusWriteBeforeRead,
        FaultKind::BusReadAfterWrite,
        FaultKind::NoInterrupt,
    ];

    /// Bit of this fault in the alarm register
    #[must_use]
    pub fn mask(self) -> u32 {
        1 << self as u8
    }
}

/// Alarm collaborator interface
#[cfg_attr(test, mockall::automock)]
pub trait Alarm: Send + Sync {
    /// Raise a fault; no acknowledgement is expected
    fn set(&self, fault: FaultKind);
}

/// Lock-free alarm register
#[derive(Debug, Default)]
pub struct AlarmRegister {
    bits: AtomicU32,
    counts: [AtomicU32; FAULT_KINDS],
}

impl AlarmRegister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current alarm bitmask
    #[must_use]
    pub fn register(&self) -> u32 {
        self.bits.load(Ordering::Relaxed)
    }

    /// Whether the given fault has been raised since the last clear
    #[must_use]
    pub fn is_set(&self, fault: FaultKind) -> bool {
        self.register() & fault.mask() != 0
    }

    /// Number of times the given fault has been raised since the last clear
    #[must_use]
    pub fn count(&self, fault: FaultKind) -> u32 {
        self.counts[fault as usize].load(Ordering::Relaxed)
    }

    /// Clear all alarms and counters
    pub fn clear(&self) {
        self.bits.store(0, Ordering::Relaxed);
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}

impl Alarm for AlarmRegister {
    fn set(&self, fault: FaultKind) {
        let previous = self.bits.fetch_or(fault.mask(), Ordering::Relaxed);
        self.counts[fault as usize].fetch_add(1, Ordering::Relaxed);
        if previous & fault.mask() == 0 {
            warn!("Alarm raised: {:?} (register = 0x{:08X})", fault, previous | fault.mask());
        }
    }
}
