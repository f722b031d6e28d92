//! # Yoke IMU
//!
//! Runs the yoke controller core on a host.
//!
//! Without inertial hardware the sensor is a synthetic bus producing a slow
//! pitch/roll sway, and the panel is a static neutral panel. Reports go to
//! the serial link named in the configuration or to the log.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yoke_imu::alarm::AlarmRegister;
use yoke_imu::config::Config;
use yoke_imu::input::rotary::Direction;
use yoke_imu::input::{PanelState, StaticPanel};
use yoke_imu::scheduler::Dispatcher;
use yoke_imu::sensor::lsm9ds1::Lsm9ds1;
use yoke_imu::sensor::synthetic::SyntheticBus;
use yoke_imu::storage::JsonFileStore;
use yoke_imu::telemetry::{self, TelemetryLogger};
use yoke_imu::transport::open_transport;
use yoke_imu::yoke::Yoke;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Depth of the encoder-step queue towards the menu
const MENU_QUEUE_DEPTH: usize = 16;

/// Depth of the telemetry queue
const TELEMETRY_QUEUE_DEPTH: usize = 256;

fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Ok(Config::load(path)?)
    } else {
        warn!("Config file {} not found, using defaults", path);
        Ok(Config::default())
    }
}

/// Cycles between telemetry records
fn telemetry_every(config: &Config) -> u64 {
    (config.telemetry.log_interval_ms / config.imu.sample_period_ms.max(1)).max(1)
}

#[tokio::main]
async fn main() -> Result<()> {
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Yoke IMU v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&config_path)?;

    let storage = JsonFileStore::open(&config.storage.path)?;
    let alarm = Arc::new(AlarmRegister::new());

    let period = config.imu.sample_period();
    let mut sensor = Lsm9ds1::new(SyntheticBus::sway(period.as_secs_f32()), alarm.clone());
    sensor.init()?;

    let transport = open_transport(&config.usb)?;
    let panel = StaticPanel::new(PanelState::default());

    let (menu_tx, mut menu_rx) = mpsc::channel::<Direction>(MENU_QUEUE_DEPTH);
    let mut yoke = Yoke::new(
        &config,
        Box::new(sensor),
        Box::new(panel),
        transport,
        Box::new(storage),
        alarm.clone(),
    )
    .with_menu(menu_tx);

    let telemetry_task = if config.telemetry.enabled {
        let logger = TelemetryLogger::new(&config.telemetry)?;
        let (sender, rx) = telemetry::channel(TELEMETRY_QUEUE_DEPTH);
        yoke = yoke.with_telemetry(sender, telemetry_every(&config));
        Some(tokio::spawn(telemetry::run_logger(logger, rx)))
    } else {
        None
    };

    tokio::spawn(async move {
        while let Some(direction) = menu_rx.recv().await {
            info!("Menu step: {:?}", direction);
        }
    });

    let dispatcher = Dispatcher::new(config.imu.queue_depth, config.imu.watchdog_period());
    let line = dispatcher.interrupt_line();
    let ticker = tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticks.tick().await;
            line.raise();
        }
    });

    info!("Sampling every {:?}, press Ctrl+C to exit", period);

    tokio::select! {
        stats = dispatcher.run(&mut yoke) => {
            info!("Dispatcher finished: {:?}", stats);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    ticker.abort();
    info!(
        "Ran {} cycles, {} reports refused, alarm register 0x{:02X}",
        yoke.cycles(),
        yoke.send_failures(),
        alarm.register()
    );

    // Dropping the pipeline closes the telemetry channel
    drop(yoke);
    if let Some(task) = telemetry_task {
        if let Ok(records) = tokio::time::timeout(Duration::from_secs(2), task).await {
            info!("Telemetry records written: {}", records.unwrap_or(0));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_interval_in_cycles() {
        let mut config = Config::default();
        assert_eq!(telemetry_every(&config), 10);

        config.telemetry.log_interval_ms = 5;
        assert_eq!(telemetry_every(&config), 1);
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_config("/nonexistent/yoke.toml").unwrap();
        assert_eq!(config.imu.sample_period_ms, 10);
    }
}
