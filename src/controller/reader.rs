//! Controller Reader - applies the mapping table to raw samples
//!
//! Each tick the reader pulls one raw sample from the bound controller, copies
//! the mapped fields into [`ControllerState`] and advances the turntable.
//!
//! ```text
//! RawController ──► RawSample ──► MappingTable ──► ControllerState
//!                                                  (buttons, axes, turntable)
//! ```
//!
//! A reader without a controller or without a mapping does nothing. Mapped indices
//! beyond the sample size are skipped one by one and leave the previous value.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::controls::LogicalControl;
use super::mapping::{MappingTable, TurntableMode};
use super::state::ControllerState;

/// Position of a hat switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchPosition {
    #[default]
    Center,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl SwitchPosition {
    /// Combines four direction buttons, opposite directions cancel out
    pub fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let vertical = up as i8 - down as i8;
        let horizontal = right as i8 - left as i8;
        match (vertical, horizontal) {
            (1, 0) => SwitchPosition::Up,
            (1, 1) => SwitchPosition::UpRight,
            (0, 1) => SwitchPosition::Right,
            (-1, 1) => SwitchPosition::DownRight,
            (-1, 0) => SwitchPosition::Down,
            (-1, -1) => SwitchPosition::DownLeft,
            (0, -1) => SwitchPosition::Left,
            (1, -1) => SwitchPosition::UpLeft,
            _ => SwitchPosition::Center,
        }
    }
}

/// A device that can report its current input as fixed-size arrays
///
/// Reading is synchronous and must return the latest cached report; it never
/// blocks and never fails. Slices are sized by the `*_count` methods.
pub trait RawController {
    fn button_count(&self) -> usize;

    fn switch_count(&self) -> usize;

    fn axis_count(&self) -> usize;

    fn current_reading(
        &self,
        buttons: &mut [bool],
        switches: &mut [SwitchPosition],
        axes: &mut [f64],
    );
}

/// One complete raw report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub buttons: Vec<bool>,
    pub switches: Vec<SwitchPosition>,
    /// Normalized to `[-1.0, 1.0]`
    pub axes: Vec<f64>,
}

impl RawSample {
    pub fn new(button_count: usize, switch_count: usize, axis_count: usize) -> Self {
        Self {
            buttons: vec![false; button_count],
            switches: vec![SwitchPosition::Center; switch_count],
            axes: vec![0.0; axis_count],
        }
    }

    /// Resizes the buffers to the controller's layout and fills them
    pub fn read_from<C: RawController + ?Sized>(&mut self, controller: &C) {
        self.buttons.clear();
        self.buttons.resize(controller.button_count(), false);
        self.switches.clear();
        self.switches
            .resize(controller.switch_count(), SwitchPosition::Center);
        self.axes.clear();
        self.axes.resize(controller.axis_count(), 0.0);
        controller.current_reading(&mut self.buttons, &mut self.switches, &mut self.axes);
    }
}

/// A stored sample is itself a controller that keeps reporting the same values
impl RawController for RawSample {
    fn button_count(&self) -> usize {
        self.buttons.len()
    }

    fn switch_count(&self) -> usize {
        self.switches.len()
    }

    fn axis_count(&self) -> usize {
        self.axes.len()
    }

    fn current_reading(
        &self,
        buttons: &mut [bool],
        switches: &mut [SwitchPosition],
        axes: &mut [f64],
    ) {
        copy_prefix(buttons, &self.buttons);
        copy_prefix(switches, &self.switches);
        copy_prefix(axes, &self.axes);
    }
}

fn copy_prefix<T: Copy>(target: &mut [T], source: &[T]) {
    let len = target.len().min(source.len());
    target[..len].copy_from_slice(&source[..len]);
}

/// Turntable conversion constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Physical-to-logical angle ratio applied in axis mode
    pub turntable_gain: f64,
    /// Degrees per unit of raw axis value; negative flips the wheel orientation
    pub axis_to_degrees: f64,
    /// Fixed speed of a held direction button in digital mode
    pub digital_speed_deg_per_sec: f64,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            turntable_gain: 2.0,
            axis_to_degrees: -360.0,
            digital_speed_deg_per_sec: 360.0,
        }
    }
}

#[derive(Debug)]
pub struct ControllerReader<C> {
    controller: Option<C>,
    mapping: Option<MappingTable>,
    settings: ReaderSettings,
    state: ControllerState,
    sample: RawSample,
}

impl<C: RawController> ControllerReader<C> {
    pub fn new(settings: ReaderSettings) -> Self {
        Self {
            controller: None,
            mapping: None,
            settings,
            state: ControllerState::new(),
            sample: RawSample::default(),
        }
    }

    /// Binds a controller and returns the previously bound one
    pub fn bind_controller(&mut self, controller: C) -> Option<C> {
        self.controller.replace(controller)
    }

    pub fn unbind_controller(&mut self) -> Option<C> {
        self.controller.take()
    }

    pub fn controller(&self) -> Option<&C> {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut C> {
        self.controller.as_mut()
    }

    pub fn set_mapping(&mut self, mapping: MappingTable) -> Option<MappingTable> {
        self.mapping.replace(mapping)
    }

    pub fn mapping(&self) -> Option<&MappingTable> {
        self.mapping.as_ref()
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Samples the bound controller once and updates the state
    ///
    /// `delta_time_secs` is the wall-clock time since the previous call; it only
    /// matters for the digital turntable.
    pub fn update(&mut self, delta_time_secs: f64) {
        let (Some(controller), Some(mapping)) = (self.controller.as_ref(), self.mapping.as_ref())
        else {
            trace!("Reader idle: controller or mapping not bound");
            return;
        };

        // Switches are read with the rest so the report stays consistent
        self.sample.read_from(controller);

        for (control, index) in mapping.buttons() {
            match self.sample.buttons.get(index) {
                Some(pressed) => self.state.set_button(control, *pressed),
                None => trace!("Skipping {}: button {} out of range", control, index),
            }
        }

        for (control, index) in mapping.axes() {
            match self.sample.axes.get(index) {
                Some(value) => self.state.set_axis(control, *value),
                None => trace!("Skipping {}: axis {} out of range", control, index),
            }
        }

        match mapping.turntable_mode() {
            TurntableMode::Axis => {
                let raw = mapping
                    .axis_index(LogicalControl::TurntableAxis)
                    .and_then(|index| self.sample.axes.get(index).copied());
                if let Some(raw) = raw {
                    let angle = raw * self.settings.axis_to_degrees;
                    self.state
                        .update_absolute(angle, self.settings.turntable_gain);
                }
            }
            TurntableMode::Digital => {
                let left = self.state.button(LogicalControl::TtLeft);
                let right = self.state.button(LogicalControl::TtRight);
                let step = self.settings.digital_speed_deg_per_sec * delta_time_secs;
                let delta = match (left, right) {
                    (true, false) => -step,
                    (false, true) => step,
                    _ => 0.0,
                };
                self.state.update_delta(delta);
            }
        }

        debug!(
            "Turntable at {:.1}° (accumulated {:.1}°)",
            self.state.turntable_angle(),
            self.state.turntable_accumulator()
        );
    }
}
