use color_eyre::{eyre::eyre, Result};
use sevenkey_meter::config::AppConfig;
use sevenkey_meter::controller::device::{DeviceInfo, DeviceRegistry};
use sevenkey_meter::driver::{run_session, CommandInbox, DriverCommand, SessionDriver};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(AppConfig::default_path)
        .ok_or_else(|| eyre!("No config path given and no config directory available"))?;
    // Read before logging is up so the configured level applies from the start
    let config = AppConfig::load_or_default(&config_path).await?;

    setup(&config.driver.log_level)?;
    if config_path.exists() {
        info!("Using configuration from {}", config_path.display());
    } else {
        warn!("{} not found, running with defaults", config_path.display());
    }

    let mut driver = SessionDriver::create(&config)?;
    let registry = driver.registry();
    registry.on_device_added(Box::new(|device: &DeviceInfo| {
        info!("Device available: {}", device)
    }));
    registry.on_device_removed(Box::new(|device: &DeviceInfo| {
        info!("Device gone: {}", device)
    }));
    for device in registry.list_devices() {
        info!("Found {} {}", device.id, device);
    }

    let cancel = CancellationToken::new();
    let (command_tx, command_rx) = mpsc::channel(16);

    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        ctrl_c_token.cancel();
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match DriverCommand::from_str(&line) {
                    Ok(command) => {
                        if command_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{} (try reset, long on|off, side 1p|2p, quit)", e),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    let mut output_rx = driver.subscribe();
    let display_token = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = display_token.cancelled() => break,
                changed = output_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let output = output_rx.borrow_and_update().clone();
                    debug!("{}", output);
                }
            }
        }
    });

    // gilrs is not Send on every platform, so the session stays on the main task
    run_session(driver, CommandInbox::new(command_rx), cancel.clone()).await;
    cancel.cancel();

    info!("Shutdown complete");
    Ok(())
}

fn setup(log_level: &str) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;

    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| Level::from_str(&value).ok())
        .or_else(|| Level::from_str(log_level).ok())
        .unwrap_or(Level::INFO);
    setup_logging_env(level);
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
