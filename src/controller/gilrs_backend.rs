//! gilrs-backed device registry and raw controller
//!
//! gilrs only updates gamepad state while its event queue is drained, so the
//! hub must be pumped once per frame before any controller is refreshed.
//!
//! The raw layout exposed to the mapping table is fixed:
//!
//! | index | button        | index | axis        |
//! |-------|---------------|-------|-------------|
//! | 0     | South         | 0     | LeftStickX  |
//! | 1     | East          | 1     | LeftStickY  |
//! | 2     | North         | 2     | LeftZ       |
//! | 3     | West          | 3     | RightStickX |
//! | 4     | C             | 4     | RightStickY |
//! | 5     | Z             | 5     | RightZ      |
//! | 6     | LeftTrigger   | 6     | DPadX       |
//! | 7     | LeftTrigger2  | 7     | DPadY       |
//! | 8     | RightTrigger  |       |             |
//! | 9     | RightTrigger2 |       |             |
//! | 10    | Select        |       |             |
//! | 11    | Start         |       |             |
//! | 12    | Mode          |       |             |
//! | 13    | LeftThumb     |       |             |
//! | 14    | RightThumb    |       |             |
//! | 15-18 | DPad U/D/L/R  |       |             |
//!
//! A single hat switch is derived from the d-pad buttons.

use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use tracing::{debug, error, info, warn};

use super::device::{
    DeviceCallback, DeviceCallbacks, DeviceEvent, DeviceId, DeviceInfo, DeviceRegistry,
};
use super::reader::{RawController, RawSample, SwitchPosition};

pub const RAW_BUTTONS: [Button; 19] = [
    Button::South,
    Button::East,
    Button::North,
    Button::West,
    Button::C,
    Button::Z,
    Button::LeftTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::Mode,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

pub const RAW_AXES: [Axis; 8] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::LeftZ,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::RightZ,
    Axis::DPadX,
    Axis::DPadY,
];

const RAW_SWITCHES: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to initialize gilrs: {0}")]
    InitializationError(String),
}

/// Owns the gilrs context and turns its connection events into [`DeviceEvent`]s
pub struct GilrsHub {
    gilrs: Gilrs,
    callbacks: DeviceCallbacks,
}

impl GilrsHub {
    pub fn new() -> Result<Self, BackendError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(BackendError::InitializationError(e.to_string()));
            }
        };

        Ok(Self {
            gilrs,
            callbacks: DeviceCallbacks::default(),
        })
    }

    /// Drains the gilrs queue, returning connection changes in arrival order
    pub fn pump(&mut self) -> Vec<DeviceEvent> {
        let mut changes = Vec::new();

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            let change = match event {
                EventType::Connected => {
                    let device = describe(id, self.gilrs.gamepad(id));
                    info!("Controller connected: {}", device);
                    DeviceEvent::Added(device)
                }
                EventType::Disconnected => {
                    let device = describe(id, self.gilrs.gamepad(id));
                    warn!("Controller disconnected: {}", device);
                    DeviceEvent::Removed(device)
                }
                _ => continue,
            };
            self.callbacks.dispatch(&change);
            changes.push(change);
        }

        changes
    }

    pub fn open(&self, device: DeviceId) -> Option<GilrsController> {
        let (_, gamepad) = self.find(device)?;
        debug!("Opening {} as raw controller", describe(gamepad.id(), gamepad));
        let mut controller = GilrsController {
            device,
            report: RawSample::new(RAW_BUTTONS.len(), RAW_SWITCHES, RAW_AXES.len()),
        };
        self.refresh(&mut controller);
        Some(controller)
    }

    /// Copies the device's current gilrs state into the controller's cached report
    ///
    /// Returns `false` when the device is gone; the report then keeps its last values.
    pub fn refresh(&self, controller: &mut GilrsController) -> bool {
        let Some((_, gamepad)) = self.find(controller.device) else {
            return false;
        };

        let report = &mut controller.report;
        for (slot, button) in report.buttons.iter_mut().zip(RAW_BUTTONS) {
            *slot = gamepad.is_pressed(button);
        }
        for (slot, axis) in report.axes.iter_mut().zip(RAW_AXES) {
            *slot = f64::from(gamepad.value(axis));
        }
        report.switches[0] = SwitchPosition::from_directions(
            gamepad.is_pressed(Button::DPadUp),
            gamepad.is_pressed(Button::DPadDown),
            gamepad.is_pressed(Button::DPadLeft),
            gamepad.is_pressed(Button::DPadRight),
        );
        true
    }

    fn find(&self, device: DeviceId) -> Option<(GamepadId, Gamepad<'_>)> {
        self.gilrs
            .gamepads()
            .find(|(id, _)| usize::from(*id) == device.0)
    }
}

impl std::fmt::Debug for GilrsHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GilrsHub")
            .field("devices", &self.list_devices())
            .finish_non_exhaustive()
    }
}

impl DeviceRegistry for GilrsHub {
    fn list_devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = self
            .gilrs
            .gamepads()
            .map(|(id, gamepad)| describe(id, gamepad))
            .collect();
        devices.sort_by_key(|device| device.id);
        devices
    }

    fn on_device_added(&mut self, callback: DeviceCallback) {
        self.callbacks.push_added(callback);
    }

    fn on_device_removed(&mut self, callback: DeviceCallback) {
        self.callbacks.push_removed(callback);
    }
}

fn describe(id: GamepadId, gamepad: Gamepad<'_>) -> DeviceInfo {
    DeviceInfo {
        id: DeviceId(usize::from(id)),
        name: gamepad.name().to_string(),
        vendor_id: gamepad.vendor_id(),
        product_id: gamepad.product_id(),
    }
}

/// Cached raw report of one gilrs gamepad, refreshed by [`GilrsHub::refresh`]
#[derive(Debug, Clone)]
pub struct GilrsController {
    device: DeviceId,
    report: RawSample,
}

impl GilrsController {
    pub fn device(&self) -> DeviceId {
        self.device
    }
}

impl RawController for GilrsController {
    fn button_count(&self) -> usize {
        self.report.button_count()
    }

    fn switch_count(&self) -> usize {
        self.report.switch_count()
    }

    fn axis_count(&self) -> usize {
        self.report.axis_count()
    }

    fn current_reading(
        &self,
        buttons: &mut [bool],
        switches: &mut [SwitchPosition],
        axes: &mut [f64],
    ) {
        self.report.current_reading(buttons, switches, axes);
    }
}
