//! Event Deriver - turns state transitions into notes and statistics
//!
//! Runs once per frame after the reader has updated the [`ControllerState`].
//! It keeps its own copy of the previous frame and never writes to the state.
//!
//! # Notes
//!
//! A note is credited for
//! - every main key press,
//! - a release held at least `short_release_ms`, if `count_long_releases` is on,
//! - every entry into the upper or lower turntable direction.
//!
//! Releases shorter than `short_release_ms` feed the release average instead.
//!
//! # Turntable directions
//!
//! ```text
//!          +delta              -delta
//! Idle ───────────► Upper ◄──────────► Lower
//!   ▲                 │                  │
//!   └─────────────────┴──────────────────┘
//!        no movement for turntable_idle_ms
//! ```
//!
//! Continuing to turn the same way does not credit further notes.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::output::{KeyGlow, MeterOutput, PlaySide, TurntableDirection};
use super::stats::{NoteRateWindow, ReleaseAverage};
use crate::controller::{ControllerState, LogicalControl, MAIN_KEY_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterSettings {
    /// Releases quicker than this count towards the release average
    pub short_release_ms: u64,
    /// Held keys light up with [`KeyGlow::Hit`] from this duration on
    pub glow_threshold_ms: u64,
    /// The turntable direction clears after this long without movement
    pub turntable_idle_ms: u64,
    /// Length of the notes-per-second window
    pub note_window_ms: u64,
    /// Credit a note when a long-held key is released
    pub count_long_releases: bool,
    pub play_side: PlaySide,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            short_release_ms: 200,
            glow_threshold_ms: 200,
            turntable_idle_ms: 200,
            note_window_ms: 1000,
            count_long_releases: false,
            play_side: PlaySide::P1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventDeriver {
    settings: MeterSettings,
    previous_keys: [bool; MAIN_KEY_COUNT],
    press_started: [Option<DateTime<Local>>; MAIN_KEY_COUNT],
    previous_accumulator: Option<f64>,
    direction: TurntableDirection,
    last_turntable_motion: Option<DateTime<Local>>,
    total_notes: u64,
    note_rate: NoteRateWindow,
    release_average: ReleaseAverage,
    output: MeterOutput,
}

impl EventDeriver {
    pub fn new(settings: MeterSettings) -> Self {
        Self {
            note_rate: NoteRateWindow::new(settings.note_window_ms),
            settings,
            previous_keys: [false; MAIN_KEY_COUNT],
            press_started: [None; MAIN_KEY_COUNT],
            previous_accumulator: None,
            direction: TurntableDirection::Idle,
            last_turntable_motion: None,
            total_notes: 0,
            release_average: ReleaseAverage::default(),
            output: MeterOutput::default(),
        }
    }

    pub fn settings(&self) -> &MeterSettings {
        &self.settings
    }

    pub fn set_count_long_releases(&mut self, enabled: bool) {
        info!("Counting long releases as notes: {}", enabled);
        self.settings.count_long_releases = enabled;
    }

    pub fn set_play_side(&mut self, side: PlaySide) {
        info!("Play side set to {}", side);
        self.settings.play_side = side;
    }

    /// Forgets everything learned from the previous controller
    ///
    /// Held keys are dropped without a release edge, and the next turntable
    /// reading only primes. Call whenever a controller is bound or unbound.
    pub fn resync_controller(&mut self) {
        self.previous_keys = [false; MAIN_KEY_COUNT];
        self.press_started = [None; MAIN_KEY_COUNT];
        self.previous_accumulator = None;
    }

    pub fn output(&self) -> &MeterOutput {
        &self.output
    }

    /// Advances one frame
    ///
    /// `state` is `None` while no controller is bound. The note window and key
    /// glow still advance; key and turntable processing is skipped.
    pub fn tick(&mut self, now: DateTime<Local>, state: Option<&ControllerState>) -> &MeterOutput {
        if let Some(state) = state {
            self.process_main_keys(now, state);
            self.process_aux_keys(state);
            self.process_turntable(now, state);
        }

        if let Some(last_motion) = self.last_turntable_motion {
            let idle_ms = (now - last_motion).num_milliseconds();
            if idle_ms > self.settings.turntable_idle_ms as i64
                && self.direction != TurntableDirection::Idle
            {
                debug!("Turntable idle after {}ms", idle_ms);
                self.direction = TurntableDirection::Idle;
            }
        }

        self.note_rate.prune(now);
        self.refresh_output(now);
        &self.output
    }

    /// Zeroes the note total and the release average
    ///
    /// Key, turntable and note-window tracking carry on untouched.
    pub fn reset(&mut self) {
        info!(
            "Resetting counters (total {}, average release {}ms over {} releases)",
            self.total_notes,
            self.release_average.average_ms(),
            self.release_average.count()
        );
        self.total_notes = 0;
        self.release_average.reset();
        self.output.total_notes = 0;
        self.output.average_release_ms = 0;
    }

    fn process_main_keys(&mut self, now: DateTime<Local>, state: &ControllerState) {
        for (index, key) in LogicalControl::MAIN_KEYS.iter().enumerate() {
            // Unmapped keys never report and never change
            let Some(pressed) = state.button_state(*key) else {
                continue;
            };
            if pressed == self.previous_keys[index] {
                continue;
            }
            self.previous_keys[index] = pressed;

            if pressed {
                self.credit_note(now, *key);
                self.press_started[index] = Some(now);
                continue;
            }

            let held_ms = self.press_started[index]
                .map(|started| (now - started).num_milliseconds())
                .unwrap_or(0);
            if held_ms < self.settings.short_release_ms as i64 {
                self.release_average.record(held_ms);
                debug!(
                    "{} released after {}ms, average now {}ms",
                    key,
                    held_ms,
                    self.release_average.average_ms()
                );
            } else if self.settings.count_long_releases {
                debug!("{} long release after {}ms counted", key, held_ms);
                self.credit_note(now, *key);
            }
        }
    }

    fn process_aux_keys(&mut self, state: &ControllerState) {
        for (index, key) in LogicalControl::AUX_KEYS.iter().enumerate() {
            if let Some(pressed) = state.button_state(*key) {
                self.output.aux_keys[index] = pressed;
            }
        }
    }

    fn process_turntable(&mut self, now: DateTime<Local>, state: &ControllerState) {
        let accumulator = state.turntable_accumulator();
        self.output.turntable_angle = state.turntable_angle();

        // The first observed frame only primes, which hides the start-up jump of an
        // absolute axis whose previous reading was assumed to be 0
        let Some(previous) = self.previous_accumulator.replace(accumulator) else {
            return;
        };

        let mut delta = accumulator - previous;
        if self.settings.play_side.mirrors_turntable() {
            delta = -delta;
        }
        if delta == 0.0 {
            return;
        }

        self.last_turntable_motion = Some(now);
        let direction = if delta > 0.0 {
            TurntableDirection::Upper
        } else {
            TurntableDirection::Lower
        };
        if self.direction != direction {
            debug!("Turntable {:?} -> {:?}", self.direction, direction);
            self.direction = direction;
            self.total_notes += 1;
            self.note_rate.push(now);
        }
    }

    fn credit_note(&mut self, now: DateTime<Local>, key: LogicalControl) {
        self.total_notes += 1;
        self.note_rate.push(now);
        debug!("Note on {} (total {})", key, self.total_notes);
    }

    fn refresh_output(&mut self, now: DateTime<Local>) {
        let glow_threshold = self.settings.glow_threshold_ms as i64;
        for index in 0..MAIN_KEY_COUNT {
            let held_long = self.previous_keys[index]
                && self.press_started[index]
                    .is_some_and(|started| (now - started).num_milliseconds() >= glow_threshold);
            self.output.glow[index] = if held_long {
                KeyGlow::Hit
            } else {
                KeyGlow::resting(index)
            };
        }

        self.output.keys = self.previous_keys;
        self.output.turntable = self.direction;
        self.output.total_notes = self.total_notes;
        self.output.notes_per_second = self.note_rate.count();
        self.output.average_release_ms = self.release_average.average_ms();
    }
}

impl Default for EventDeriver {
    fn default() -> Self {
        Self::new(MeterSettings::default())
    }
}
