//! # Transport Module
//!
//! Hands finished reports to the host.
//!
//! The control pipeline only depends on [`ReportTransport`]. Two
//! implementations are provided:
//! - [`serial::SerialTransport`]: framed reports over a serial link to a USB
//!   HID bridge
//! - [`LogTransport`]: logs encoded reports, used when no port is configured

pub mod crc;
pub mod frame;
pub mod link;
pub mod serial;

use async_trait::async_trait;
use tracing::{info, trace};

use crate::config::UsbConfig;
use crate::control::report::{ControlReport, UsbIdentity, HID_REPORT_DESCRIPTOR};
use crate::error::Result;

pub use serial::SerialTransport;

/// Sink of control reports
#[async_trait]
pub trait ReportTransport: Send {
    /// Sends one report; `false` if it could not be delivered
    async fn send_report(&mut self, report: &ControlReport) -> bool;

    /// Vendor/product/release presented to the host
    fn identity(&self) -> UsbIdentity;

    /// HID report descriptor of the report layout
    fn descriptor(&self) -> &'static [u8] {
        &HID_REPORT_DESCRIPTOR
    }
}

/// Transport that only logs reports
#[derive(Debug)]
pub struct LogTransport {
    identity: UsbIdentity,
    reports: u64,
}

impl LogTransport {
    #[must_use]
    pub fn new(identity: UsbIdentity) -> Self {
        Self { identity, reports: 0 }
    }

    /// Reports accepted so far
    #[must_use]
    pub fn reports(&self) -> u64 {
        self.reports
    }
}

#[async_trait]
impl ReportTransport for LogTransport {
    async fn send_report(&mut self, report: &ControlReport) -> bool {
        self.reports += 1;
        trace!("Report {}: {:02X?}", self.reports, report.encode().as_ref());
        true
    }

    fn identity(&self) -> UsbIdentity {
        self.identity
    }
}

/// Opens the transport selected by the configuration
///
/// An empty `port` selects the [`LogTransport`].
///
/// # Errors
///
/// Returns error if the configured serial port cannot be opened
pub fn open_transport(config: &UsbConfig) -> Result<Box<dyn ReportTransport>> {
    let identity = UsbIdentity::from(config);
    info!(
        "Joystick identity: VID=0x{:04X} PID=0x{:04X} release={}",
        identity.vendor_id, identity.product_id, identity.release
    );

    if config.port.is_empty() {
        info!("No report port configured, logging reports");
        return Ok(Box::new(LogTransport::new(identity)));
    }

    let transport = SerialTransport::open_with_paths(&[config.port.as_str()], config.baud_rate, identity)?;
    Ok(Box::new(transport))
}
