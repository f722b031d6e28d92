//! JSONL telemetry file writer with rotation.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::TelemetryRecord;
use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

#[derive(Serialize)]
struct Line<'a> {
    timestamp: String,
    #[serde(flatten)]
    record: &'a TelemetryRecord,
}

/// Rotating JSONL writer
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files_opened: u64,
    records_written: u64,
}

impl TelemetryLogger {
    /// Creates the log directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            files_opened: 0,
            records_written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Appends one record, rotating first if the current file is full
    ///
    /// # Errors
    ///
    /// Returns error on serialization or file I/O failure
    pub fn log(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(&Line {
            timestamp: Utc::now().to_rfc3339(),
            record,
        })?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
        }
        self.records_in_file += 1;
        self.records_written += 1;
        Ok(())
    }

    /// Flushes buffered records to disk
    ///
    /// # Errors
    ///
    /// Returns error on file I/O failure
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.files_opened,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        debug!("Opening telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.records_in_file = 0;
        self.files_opened += 1;
        self.prune()
    }

    /// Log files in the directory, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be listed
    pub fn log_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(FILE_PREFIX))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn prune(&self) -> Result<()> {
        let files = self.log_files()?;
        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for path in &files[..excess] {
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Drains `rx` into `logger` until every sender is dropped
///
/// Returns the number of records written. Write failures are logged and the
/// record is skipped.
pub async fn run_logger(mut logger: TelemetryLogger, mut rx: mpsc::Receiver<TelemetryRecord>) -> u64 {
    info!("Telemetry logging to {}", logger.dir().display());

    while let Some(record) = rx.recv().await {
        if let Err(e) = logger.log(&record) {
            error!("Telemetry write failed: {}", e);
        }
    }

    if let Err(e) = logger.flush() {
        error!("Telemetry flush failed: {}", e);
    }
    info!("Telemetry stopped after {} records", logger.records_written());
    logger.records_written()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::report::ControlReport;
    use crate::fusion::OrientationSnapshot;
    use tempfile::TempDir;

    fn config(dir: &Path, per_file: usize, keep: usize) -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            log_dir: dir.to_string_lossy().into_owned(),
            max_records_per_file: per_file,
            max_files_to_keep: keep,
            ..Default::default()
        }
    }

    fn record(cycle: u64) -> TelemetryRecord {
        TelemetryRecord {
            cycle,
            watchdog: cycle % 2 == 1,
            orientation: OrientationSnapshot::default(),
            report: ControlReport {
                y: cycle as i16,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_writes_jsonl_records() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(dir.path(), 100, 5)).unwrap();
        logger.log(&record(1)).unwrap();
        logger.log(&record(2)).unwrap();
        logger.flush().unwrap();

        let files = logger.log_files().unwrap();
        assert_eq!(files.len(), 1);
        let contents = fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["cycle"], 1);
        assert_eq!(lines[0]["watchdog"], true);
        assert_eq!(lines[1]["report"]["y"], 2);
        assert!(lines[1]["timestamp"].is_string());
    }

    #[test]
    fn test_rotation_keeps_newest_files() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(dir.path(), 3, 2)).unwrap();
        for cycle in 0..7 {
            logger.log(&record(cycle)).unwrap();
        }
        logger.flush().unwrap();

        let files = logger.log_files().unwrap();
        assert_eq!(files.len(), 2);
        let counts: Vec<usize> = files
            .iter()
            .map(|path| fs::read_to_string(path).unwrap().lines().count())
            .collect();
        assert_eq!(counts, vec![3, 1]);
        assert_eq!(logger.records_written(), 7);
    }

    #[test]
    fn test_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        let mut logger = TelemetryLogger::new(&config(dir.path(), 1, 1)).unwrap();
        for cycle in 0..3 {
            logger.log(&record(cycle)).unwrap();
        }

        assert_eq!(logger.log_files().unwrap().len(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_run_logger_drains_channel() {
        let dir = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(&config(dir.path(), 100, 5)).unwrap();
        let (sender, rx) = crate::telemetry::channel(16);

        let task = tokio::spawn(run_logger(logger, rx));
        for cycle in 0..5 {
            assert!(sender.offer(record(cycle)));
        }
        drop(sender);

        assert_eq!(task.await.unwrap(), 5);
    }
}
