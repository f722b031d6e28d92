//! # Scheduler Module
//!
//! Cooperative dispatch of the periodic control handler.
//!
//! Interrupt-side producers never do work themselves: an [`InterruptLine`]
//! only posts a `DataReady` event onto a bounded queue, and a
//! [`CommandSender`] posts calibration commands onto the same queue. A single
//! [`Dispatcher`] task drains the queue and runs the [`CycleHandler`] to
//! completion for each event, so handler invocations never overlap.
//!
//! ## Watchdog
//!
//! The dispatcher waits for the next event with a deadline of one watchdog
//! period, re-armed whenever a cycle starts. If the data-ready interrupt is
//! lost the deadline expires and the cycle runs with [`Trigger::Watchdog`]
//! instead; the handler reuses its previous sensor sample. Commands do not
//! re-arm the watchdog.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace};

use crate::error::{Result, YokeError};

/// Why a cycle runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The sensor signalled a new sample
    DataReady,
    /// The data-ready signal did not arrive within the watchdog period
    Watchdog,
}

/// Commands accepted from the console and menu collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartCalibration,
    StopCalibration,
    ToggleCalibration,
}

/// Entry of the control queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    DataReady,
    Command(Command),
}

/// Work run by the dispatcher
#[async_trait]
pub trait CycleHandler: Send {
    /// One periodic cycle
    async fn on_cycle(&mut self, trigger: Trigger);

    /// One command, run between cycles
    async fn on_command(&mut self, command: Command);
}

/// Producer side of the data-ready interrupt
#[derive(Debug, Clone)]
pub struct InterruptLine {
    tx: mpsc::Sender<Event>,
}

impl InterruptLine {
    /// Posts a data-ready event without blocking
    ///
    /// Returns `false` if the event was not queued: the queue is full (the
    /// pending events already cover this sample) or the dispatcher stopped.
    pub fn raise(&self) -> bool {
        match self.tx.try_send(Event::DataReady) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("Control queue full, data-ready coalesced");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Producer side of calibration commands
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Event>,
}

impl CommandSender {
    /// Posts a command, waiting for queue space
    ///
    /// # Errors
    ///
    /// Returns [`YokeError::QueueClosed`] if the dispatcher has stopped
    pub async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(Event::Command(command))
            .await
            .map_err(|_| YokeError::QueueClosed)
    }
}

/// Counters of a finished dispatch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub data_ready_cycles: u64,
    pub watchdog_cycles: u64,
    pub commands: u64,
}

/// Consumer side of the control queue
#[derive(Debug)]
pub struct Dispatcher {
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
    watchdog: Duration,
}

impl Dispatcher {
    /// Creates the queue with room for `queue_depth` events
    #[must_use]
    pub fn new(queue_depth: usize, watchdog: Duration) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        Self { tx, rx, watchdog }
    }

    #[must_use]
    pub fn interrupt_line(&self) -> InterruptLine {
        InterruptLine { tx: self.tx.clone() }
    }

    #[must_use]
    pub fn command_sender(&self) -> CommandSender {
        CommandSender { tx: self.tx.clone() }
    }

    /// Runs `handler` until every [`InterruptLine`] and [`CommandSender`] is dropped
    pub async fn run<H: CycleHandler + ?Sized>(self, handler: &mut H) -> DispatchStats {
        let Dispatcher { tx, mut rx, watchdog } = self;
        drop(tx);

        info!("Dispatcher started (watchdog {:?})", watchdog);
        let mut stats = DispatchStats::default();
        let mut deadline = Instant::now() + watchdog;

        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(Event::DataReady)) => {
                    deadline = Instant::now() + watchdog;
                    stats.data_ready_cycles += 1;
                    handler.on_cycle(Trigger::DataReady).await;
                }
                Ok(Some(Event::Command(command))) => {
                    debug!("Command: {:?}", command);
                    stats.commands += 1;
                    handler.on_command(command).await;
                }
                Ok(None) => break,
                Err(_) => {
                    deadline = Instant::now() + watchdog;
                    stats.watchdog_cycles += 1;
                    handler.on_cycle(Trigger::Watchdog).await;
                }
            }
        }

        info!(
            "Dispatcher stopped: {} cycles, {} watchdog cycles, {} commands",
            stats.data_ready_cycles, stats.watchdog_cycles, stats.commands
        );
        stats
    }
}
