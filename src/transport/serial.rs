//! # Serial Report Link
//!
//! Sends framed reports to a USB HID bridge over a serial port.
//!
//! This module handles:
//! - Opening the serial device (8N1, no flow control)
//! - Framing each report ([`super::frame`])
//! - Counting delivered and failed frames; a failed write is logged and the
//!   next cycle simply sends the next report

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::frame::encode_frame;
use super::link::{FrameLink, SerialStreamLink};
use super::ReportTransport;
use crate::control::report::{ControlReport, UsbIdentity};
use crate::error::{Result, YokeError};

/// Framed report transport over any [`FrameLink`]
pub struct SerialTransport<L: FrameLink> {
    link: L,
    device_path: String,
    identity: UsbIdentity,
    frames_sent: u64,
    failures: u64,
}

impl<L: FrameLink> std::fmt::Debug for SerialTransport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device_path", &self.device_path)
            .field("frames_sent", &self.frames_sent)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl SerialTransport<SerialStreamLink> {
    /// Open the first usable device among `paths`
    ///
    /// # Errors
    ///
    /// Returns [`YokeError::SerialPortNotFound`] if no path could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use yoke_imu::config::UsbConfig;
    /// use yoke_imu::control::report::UsbIdentity;
    /// use yoke_imu::transport::serial::SerialTransport;
    ///
    /// let identity = UsbIdentity::from(&UsbConfig::default());
    /// let transport = SerialTransport::open_with_paths(&["/dev/ttyACM0"], 115_200, identity)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, identity: UsbIdentity) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Report link opened at {} ({} baud)", path, baud_rate);
                    return Ok(SerialTransport::new(SerialStreamLink::new(port), path, identity));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                }
            }
        }

        Err(YokeError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| YokeError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

impl<L: FrameLink> SerialTransport<L> {
    /// Wraps an already opened link
    pub fn new(link: L, device_path: &str, identity: UsbIdentity) -> Self {
        Self {
            link,
            device_path: device_path.to_string(),
            identity,
            frames_sent: 0,
            failures: 0,
        }
    }

    /// Path of the serial device
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Frames delivered so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Frames that failed to write
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

#[async_trait]
impl<L: FrameLink> ReportTransport for SerialTransport<L> {
    async fn send_report(&mut self, report: &ControlReport) -> bool {
        let frame = encode_frame(report);
        match self.link.send_frame(&frame).await {
            Ok(()) => {
                self.frames_sent += 1;
                true
            }
            Err(e) => {
                self.failures += 1;
                // First failure, then every 100th
                if self.failures % 100 == 1 {
                    warn!("Failed to send report frame: {} ({} failures)", e, self.failures);
                }
                false
            }
        }
    }

    fn identity(&self) -> UsbIdentity {
        self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UsbConfig;
    use crate::transport::link::mocks::FrameRecorder;
    use std::io;

    fn transport(link: FrameRecorder) -> SerialTransport<FrameRecorder> {
        SerialTransport::new(link, "/dev/mock", UsbIdentity::from(&UsbConfig::default()))
    }

    #[tokio::test]
    async fn test_send_report_delivers_one_frame() {
        let link = FrameRecorder::new();
        let mut transport = transport(link.clone());
        let report = ControlReport {
            y: 100,
            buttons: 0x07FF,
            ..Default::default()
        };

        assert!(transport.send_report(&report).await);

        assert_eq!(link.reports(), vec![report]);
        assert_eq!(link.malformed(), 0);
        assert_eq!(transport.frames_sent(), 1);
    }

    #[test]
    fn test_refused_frame_returns_false() {
        let link = FrameRecorder::new();
        link.refuse_next(1, io::ErrorKind::BrokenPipe);
        let mut transport = transport(link.clone());

        let sent = tokio_test::block_on(transport.send_report(&ControlReport::default()));
        assert!(!sent);
        assert_eq!(transport.failures(), 1);
        assert_eq!(transport.frames_sent(), 0);
        assert!(link.reports().is_empty());
    }

    #[test]
    fn test_link_recovers_after_failures() {
        let link = FrameRecorder::new();
        link.refuse_next(2, io::ErrorKind::TimedOut);
        let mut transport = transport(link.clone());

        let results: Vec<bool> = (0..4i16)
            .map(|x| tokio_test::block_on(transport.send_report(&ControlReport { x, ..Default::default() })))
            .collect();

        assert_eq!(results, vec![false, false, true, true]);
        assert_eq!(transport.failures(), 2);
        assert_eq!(transport.frames_sent(), 2);
        let delivered: Vec<i16> = link.reports().iter().map(|r| r.x).collect();
        assert_eq!(delivered, vec![2, 3]);
    }

    #[test]
    fn test_identity_and_path() {
        let transport = transport(FrameRecorder::new());
        assert_eq!(transport.identity().product_id, 0x5711);
        assert_eq!(transport.device_path(), "/dev/mock");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let identity = UsbIdentity::from(&UsbConfig::default());
        let result = SerialTransport::open_with_paths(&["/dev/nonexistent0", "/dev/nonexistent1"], 115_200, identity);

        match result {
            Err(YokeError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }
}
