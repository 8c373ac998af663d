//! Frame driver - the per-frame loop around the core
//!
//! Owns the gilrs hub, the reader and the deriver, and runs them on a fixed
//! interval. The session alternates between two states:
//!
//! ```text
//!            device found
//! Searching ─────────────► Running
//!     ▲                       │
//!     └───────────────────────┘
//!         bound device removed
//! ```
//!
//! Every changed [`MeterOutput`] is published on a watch channel. Commands arrive
//! on an mpsc channel; cancellation goes through a [`CancellationToken`].

use chrono::Local;
use statum::{machine, state};
use std::str::FromStr;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ConfigError, DriverSettings};
use crate::controller::device::{DeviceEvent, DeviceInfo, DeviceRegistry};
use crate::controller::gilrs_backend::{BackendError, GilrsController, GilrsHub};
use crate::controller::ControllerReader;
use crate::meter::{EventDeriver, MeterOutput, PlaySide};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Backend error: {0}")]
    BackendError(#[from] BackendError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Runtime commands accepted by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    Reset,
    CountLongReleases(bool),
    SetPlaySide(PlaySide),
    Quit,
}

impl FromStr for DriverCommand {
    type Err = String;

    /// Parses `reset`, `long on|off`, `side 1p|2p` and `quit`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<String> = line
            .split_whitespace()
            .map(|word| word.to_ascii_lowercase())
            .collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["reset"] => Ok(DriverCommand::Reset),
            ["long", "on"] => Ok(DriverCommand::CountLongReleases(true)),
            ["long", "off"] => Ok(DriverCommand::CountLongReleases(false)),
            ["side", "1p"] => Ok(DriverCommand::SetPlaySide(PlaySide::P1)),
            ["side", "2p"] => Ok(DriverCommand::SetPlaySide(PlaySide::P2)),
            ["quit"] | ["exit"] => Ok(DriverCommand::Quit),
            _ => Err(format!("unknown command '{}'", line.trim())),
        }
    }
}

/// Command receiver that goes quiet instead of spinning once all senders are gone
#[derive(Debug)]
pub struct CommandInbox {
    receiver: mpsc::Receiver<DriverCommand>,
    open: bool,
}

impl CommandInbox {
    pub fn new(receiver: mpsc::Receiver<DriverCommand>) -> Self {
        Self {
            receiver,
            open: true,
        }
    }

    pub async fn next(&mut self) -> DriverCommand {
        if self.open {
            if let Some(command) = self.receiver.recv().await {
                return command;
            }
            debug!("Command channel closed");
            self.open = false;
        }
        std::future::pending().await
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Searching,
    Running,
}

#[machine]
#[derive(Debug)]
pub struct SessionDriver<S: SessionState> {
    // gilrs context and hot-plug notifications
    hub: GilrsHub,

    // Decoding and derivation
    reader: ControllerReader<GilrsController>,
    deriver: EventDeriver,

    settings: DriverSettings,

    // Published snapshots
    output_sender: watch::Sender<MeterOutput>,

    // Monotonic time of the previous frame
    last_frame: Instant,
}

/// What ended a phase of the session
enum PhaseEnd {
    Switch,
    Stop,
}

// Methods available in all states
impl<S: SessionState> SessionDriver<S> {
    pub fn subscribe(&self) -> watch::Receiver<MeterOutput> {
        debug!("New subscriber to meter output");
        self.output_sender.subscribe()
    }

    pub fn registry(&mut self) -> &mut impl DeviceRegistry {
        &mut self.hub
    }

    fn frame_timer(&self) -> Interval {
        let mut timer = interval(Duration::from_millis(self.settings.frame_interval_ms.max(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    /// Applies a command; `false` asks the session to stop
    fn handle_command(&mut self, command: DriverCommand) -> bool {
        info!("Command: {:?}", command);
        match command {
            DriverCommand::Reset => self.deriver.reset(),
            DriverCommand::CountLongReleases(enabled) => {
                self.deriver.set_count_long_releases(enabled)
            }
            DriverCommand::SetPlaySide(side) => self.deriver.set_play_side(side),
            DriverCommand::Quit => return false,
        }
        self.publish();
        true
    }

    /// Runs reader and deriver for one frame and returns the elapsed seconds
    fn frame(&mut self) -> f64 {
        let now = Local::now();
        let frame_start = Instant::now();
        let delta_secs = frame_delta_secs(self.last_frame, frame_start);
        self.last_frame = frame_start;

        let bound = match self.reader.controller_mut() {
            Some(controller) => self.hub.refresh(controller),
            None => false,
        };
        if bound {
            self.reader.update(delta_secs);
            self.deriver.tick(now, Some(self.reader.state()));
        } else {
            self.deriver.tick(now, None);
        }

        self.publish();
        delta_secs
    }

    fn publish(&self) {
        let output = self.deriver.output();
        self.output_sender.send_if_modified(|current| {
            if current != output {
                *current = output.clone();
                true
            } else {
                false
            }
        });
    }
}

impl SessionDriver<Searching> {
    pub fn create(config: &AppConfig) -> Result<Self, DriverError> {
        info!("Creating session driver with settings: {:?}", config.driver);

        let hub = GilrsHub::new()?;
        let mut reader = ControllerReader::new(config.reader.clone());
        reader.set_mapping(config.mapping_table()?);
        let deriver = EventDeriver::new(config.meter.clone());
        let (output_sender, _) = watch::channel(MeterOutput::default());

        Ok(Self::new(
            hub,
            reader,
            deriver,
            config.driver.clone(),
            output_sender,
            Instant::now(),
        ))
    }

    /// Waits for a device to bind, keeping the meter ticking meanwhile
    ///
    /// Returns `None` on quit or cancellation.
    pub async fn search(
        mut self,
        commands: &mut CommandInbox,
        cancel: &CancellationToken,
    ) -> Option<SessionDriver<Running>> {
        info!("Searching for a controller");
        let mut timer = self.frame_timer();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                command = commands.next() => {
                    if !self.handle_command(command) {
                        return None;
                    }
                }
                _ = timer.tick() => {
                    self.hub.pump();
                    if let Some(device) = self.pick_device() {
                        if let Some(controller) = self.hub.open(device.id) {
                            info!("Binding {}", device);
                            self.reader.bind_controller(controller);
                            self.deriver.resync_controller();
                            return Some(self.transition());
                        }
                        warn!("{} vanished before it could be opened", device);
                    }
                    self.frame();
                }
            }
        }
    }

    fn pick_device(&self) -> Option<DeviceInfo> {
        let devices = self.hub.list_devices();
        match self.settings.preferred_device {
            Some(preferred) => devices.into_iter().find(|device| device.id.0 == preferred),
            None => devices.into_iter().next(),
        }
    }
}

impl SessionDriver<Running> {
    /// Runs frames until the bound device goes away
    ///
    /// Returns `None` on quit or cancellation.
    pub async fn run(
        mut self,
        commands: &mut CommandInbox,
        cancel: &CancellationToken,
    ) -> Option<SessionDriver<Searching>> {
        let mut timer = self.frame_timer();
        info!(
            "Running frames every {} ms",
            self.settings.frame_interval_ms
        );

        let mut frames: u64 = 0;
        let mut frame_secs = 0.0;
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);

        let end = loop {
            tokio::select! {
                _ = cancel.cancelled() => break PhaseEnd::Stop,
                command = commands.next() => {
                    if !self.handle_command(command) {
                        break PhaseEnd::Stop;
                    }
                }
                _ = timer.tick() => {
                    if self.bound_device_removed() {
                        break PhaseEnd::Switch;
                    }
                    frame_secs += self.frame();
                    frames += 1;

                    let now = Local::now();
                    if now - last_stats_time > stats_interval {
                        info!(
                            "Frame stats: {} frames, avg {:.2} ms/frame, {} notes total",
                            frames,
                            frame_secs * 1000.0 / frames as f64,
                            self.deriver.output().total_notes
                        );
                        frames = 0;
                        frame_secs = 0.0;
                        last_stats_time = now;
                    }
                }
            }
        };

        match end {
            PhaseEnd::Stop => None,
            PhaseEnd::Switch => {
                if let Some(controller) = self.reader.unbind_controller() {
                    warn!("Controller {} removed, unbinding", controller.device());
                }
                self.deriver.resync_controller();
                Some(self.transition())
            }
        }
    }

    fn bound_device_removed(&mut self) -> bool {
        let Some(bound) = self.reader.controller().map(GilrsController::device) else {
            return true;
        };
        self.hub
            .pump()
            .iter()
            .any(|event| matches!(event, DeviceEvent::Removed(device) if device.id == bound))
    }
}

/// Seconds between two frames, never negative
fn frame_delta_secs(previous: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(previous).as_secs_f64()
}

/// Alternates between searching and running until quit or cancellation
pub async fn run_session(
    driver: SessionDriver<Searching>,
    mut commands: CommandInbox,
    cancel: CancellationToken,
) {
    let mut searching = driver;
    loop {
        let Some(running) = searching.search(&mut commands, &cancel).await else {
            break;
        };
        let Some(next) = running.run(&mut commands, &cancel).await else {
            break;
        };
        searching = next;
    }
    info!("Session finished");
}
