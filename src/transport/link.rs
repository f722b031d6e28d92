//! Byte link under the serial report transport.
//!
//! A link moves whole frames: [`FrameLink::send_frame`] either delivers the
//! complete frame to the device or fails, so a frame is never left half
//! written in the output buffer when the next cycle starts.

use async_trait::async_trait;
use std::io;
use tokio::io::AsyncWriteExt;

/// Frame-at-a-time output of the report link
#[async_trait]
pub trait FrameLink: Send {
    /// Writes `frame` and drains it to the device
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// [`FrameLink`] over an opened serial device
pub struct SerialStreamLink {
    stream: tokio_serial::SerialStream,
    bytes_written: u64,
}

impl std::fmt::Debug for SerialStreamLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStreamLink")
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

impl SerialStreamLink {
    pub fn new(stream: tokio_serial::SerialStream) -> Self {
        Self {
            stream,
            bytes_written: 0,
        }
    }

    /// Bytes handed to the device so far
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[async_trait]
impl FrameLink for SerialStreamLink {
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        self.bytes_written += frame.len() as u64;
        Ok(())
    }
}
