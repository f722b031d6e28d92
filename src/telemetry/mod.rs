//! # Telemetry Module
//!
//! Handles telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - Collecting orientation snapshots and reports from the control pipeline
//! - Formatting as JSONL (JSON Lines), one timestamped record per line
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files
//!
//! The pipeline never waits on telemetry: records are offered through
//! [`TelemetrySender::offer`] and dropped when the logger falls behind.

pub mod logger;

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::control::report::ControlReport;
use crate::fusion::OrientationSnapshot;

pub use logger::{run_logger, TelemetryLogger};

/// One telemetry sample of the control pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Cycle counter of the pipeline
    pub cycle: u64,
    /// Cycle ran from the watchdog instead of the data-ready interrupt
    pub watchdog: bool,
    pub orientation: OrientationSnapshot,
    pub report: ControlReport,
}

/// Non-blocking producer side of the telemetry channel
#[derive(Debug, Clone)]
pub struct TelemetrySender {
    tx: mpsc::Sender<TelemetryRecord>,
    dropped: Arc<AtomicU64>,
}

impl TelemetrySender {
    /// Offers a record; returns `false` if it was dropped
    pub fn offer(&self, record: TelemetryRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Records dropped so far
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Creates the telemetry channel
#[must_use]
pub fn channel(capacity: usize) -> (TelemetrySender, mpsc::Receiver<TelemetryRecord>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TelemetrySender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cycle: u64) -> TelemetryRecord {
        TelemetryRecord {
            cycle,
            watchdog: false,
            orientation: OrientationSnapshot::default(),
            report: ControlReport::default(),
        }
    }

    #[tokio::test]
    async fn test_offer_drops_when_full() {
        let (sender, mut rx) = channel(2);
        assert!(sender.offer(record(1)));
        assert!(sender.offer(record(2)));
        assert!(!sender.offer(record(3)));
        assert_eq!(sender.dropped(), 1);

        assert_eq!(rx.recv().await.map(|r| r.cycle), Some(1));
        assert!(sender.offer(record(4)));
    }

    #[test]
    fn test_offer_after_receiver_dropped() {
        let (sender, rx) = channel(4);
        drop(rx);
        assert!(!sender.offer(record(1)));
        assert_eq!(sender.dropped(), 1);
    }

    #[test]
    fn test_record_serializes_nested() {
        let json = serde_json::to_value(record(7)).unwrap();
        assert_eq!(json["cycle"], 7);
        assert_eq!(json["report"]["hat"], 0);
        assert_eq!(json["orientation"]["calibrated"], false);
    }
}
