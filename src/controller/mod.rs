//! Controller subsystem for 7-key turntable input
//!
//! Implements the decoding half of the pipeline:
//!
//! 1. [`mapping`] - raw index to logical control resolution
//! 2. [`reader`] - per-tick sampling into [`state::ControllerState`]
//! 3. [`state`] - decoded buttons, axes and the unwrapped turntable angle
//!
//! # Architecture
//!
//! ```text
//! DeviceRegistry ──► RawController ──► ControllerReader ──► ControllerState
//! (gilrs hub)        (cached report)   (mapping applied)    (read by the meter)
//! ```

pub mod controls;
pub mod device;
pub mod error;
pub mod gilrs_backend;
pub mod mapping;
pub mod reader;
pub mod state;

pub use controls::{LogicalControl, AUX_KEY_COUNT, MAIN_KEY_COUNT};
pub use device::{DeviceEvent, DeviceId, DeviceInfo, DeviceRegistry};
pub use error::MappingError;
pub use mapping::{MappingConfig, MappingTable, TurntableMode};
pub use reader::{ControllerReader, RawController, RawSample, ReaderSettings, SwitchPosition};
pub use state::{normalize_angle, ControllerState};
