//! Mapping from raw HID indices to logical controls
//!
//! A [`MappingTable`] is built once per controller session, either from the
//! built-in layout or from a [`MappingConfig`] loaded out of the TOML config.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::controls::{ControlKind, LogicalControl};
use super::error::MappingError;

/// How the turntable angle is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurntableMode {
    /// Continuous absolute axis in `[-1.0, 1.0]`
    #[default]
    Axis,
    /// Two direction buttons turning at a fixed speed
    Digital,
}

/// Serializable form of a mapping table, as written in the config file
///
/// Fields left out of a `[mapping]` section are empty, not the default layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub turntable_mode: TurntableMode,
    #[serde(default)]
    pub buttons: BTreeMap<LogicalControl, usize>,
    #[serde(default)]
    pub axes: BTreeMap<LogicalControl, usize>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        let table = MappingTable::default_layout();
        Self {
            turntable_mode: table.turntable_mode,
            buttons: table.buttons.into_iter().collect(),
            axes: table.axes.into_iter().collect(),
        }
    }
}

/// Resolved raw indices for one controller session
#[derive(Debug, Clone, PartialEq)]
pub struct MappingTable {
    buttons: HashMap<LogicalControl, usize>,
    axes: HashMap<LogicalControl, usize>,
    turntable_mode: TurntableMode,
}

impl MappingTable {
    pub fn builder(turntable_mode: TurntableMode) -> MappingBuilder {
        MappingBuilder {
            buttons: HashMap::new(),
            axes: HashMap::new(),
            turntable_mode,
        }
    }

    /// Layout of a typical USB 7-key controller
    ///
    /// Keys 1-7 on buttons 0-6, E1-E4 on buttons 8-11, turntable on axis 0.
    pub fn default_layout() -> Self {
        let mut builder = Self::builder(TurntableMode::Axis);
        for (index, key) in LogicalControl::MAIN_KEYS.iter().enumerate() {
            builder.map_button(*key, index);
        }
        for (index, key) in LogicalControl::AUX_KEYS.iter().enumerate() {
            builder.map_button(*key, index + 8);
        }
        builder.map_axis(LogicalControl::TurntableAxis, 0);

        // Every control above has the right kind
        Self {
            buttons: builder.buttons,
            axes: builder.axes,
            turntable_mode: builder.turntable_mode,
        }
    }

    pub fn from_config(config: &MappingConfig) -> Result<Self, MappingError> {
        let mut builder = Self::builder(config.turntable_mode);
        for (control, index) in &config.buttons {
            builder.map_button(*control, *index);
        }
        for (control, index) in &config.axes {
            builder.map_axis(*control, *index);
        }
        builder.build()
    }

    pub fn turntable_mode(&self) -> TurntableMode {
        self.turntable_mode
    }

    pub fn button_index(&self, control: LogicalControl) -> Option<usize> {
        self.buttons.get(&control).copied()
    }

    pub fn axis_index(&self, control: LogicalControl) -> Option<usize> {
        self.axes.get(&control).copied()
    }

    pub fn buttons(&self) -> impl Iterator<Item = (LogicalControl, usize)> + '_ {
        self.buttons.iter().map(|(control, index)| (*control, *index))
    }

    pub fn axes(&self) -> impl Iterator<Item = (LogicalControl, usize)> + '_ {
        self.axes.iter().map(|(control, index)| (*control, *index))
    }
}

/// Collects raw index assignments and validates them into a [`MappingTable`]
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    buttons: HashMap<LogicalControl, usize>,
    axes: HashMap<LogicalControl, usize>,
    turntable_mode: TurntableMode,
}

impl MappingBuilder {
    pub fn map_button(&mut self, control: LogicalControl, raw_index: usize) -> &mut Self {
        self.buttons.insert(control, raw_index);
        self
    }

    pub fn map_axis(&mut self, control: LogicalControl, raw_index: usize) -> &mut Self {
        self.axes.insert(control, raw_index);
        self
    }

    pub fn build(&self) -> Result<MappingTable, MappingError> {
        for control in self.buttons.keys() {
            check_kind(*control, ControlKind::Button)?;
        }
        for control in self.axes.keys() {
            check_kind(*control, ControlKind::Axis)?;
        }

        match self.turntable_mode {
            TurntableMode::Axis if !self.axes.contains_key(&LogicalControl::TurntableAxis) => {
                warn!("Axis turntable mode without a TurntableAxis mapping, turntable stays idle");
            }
            TurntableMode::Digital
                if !self.buttons.contains_key(&LogicalControl::TtLeft)
                    || !self.buttons.contains_key(&LogicalControl::TtRight) =>
            {
                warn!("Digital turntable mode without both TT_Left and TT_Right mapped");
            }
            _ => {}
        }

        debug!(
            "Built mapping table: {} buttons, {} axes, turntable {:?}",
            self.buttons.len(),
            self.axes.len(),
            self.turntable_mode
        );

        Ok(MappingTable {
            buttons: self.buttons.clone(),
            axes: self.axes.clone(),
            turntable_mode: self.turntable_mode,
        })
    }
}

fn check_kind(control: LogicalControl, found: ControlKind) -> Result<(), MappingError> {
    let expected = control.kind();
    if expected == found {
        Ok(())
    } else {
        Err(MappingError::WrongKind {
            control,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_places_effectors_after_a_gap() {
        let table = MappingTable::default_layout();
        assert_eq!(table.turntable_mode(), TurntableMode::Axis);
        assert_eq!(table.button_index(LogicalControl::B1), Some(0));
        assert_eq!(table.button_index(LogicalControl::B7), Some(6));
        assert_eq!(table.button_index(LogicalControl::E1), Some(8));
        assert_eq!(table.button_index(LogicalControl::E4), Some(11));
        assert_eq!(table.axis_index(LogicalControl::TurntableAxis), Some(0));
        assert_eq!(table.button_index(LogicalControl::TtLeft), None);
    }

    #[test]
    fn axis_control_in_button_table_is_rejected() {
        let err = MappingTable::builder(TurntableMode::Axis)
            .map_button(LogicalControl::TurntableAxis, 3)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::WrongKind {
                control: LogicalControl::TurntableAxis,
                expected: ControlKind::Axis,
                found: ControlKind::Button,
            }
        );
    }

    #[test]
    fn button_control_in_axis_table_is_rejected() {
        let result = MappingTable::builder(TurntableMode::Digital)
            .map_axis(LogicalControl::TtLeft, 1)
            .build();
        assert!(matches!(result, Err(MappingError::WrongKind { .. })));
    }

    #[test]
    fn config_round_trips_through_table() {
        let config = MappingConfig::default();
        let table = MappingTable::from_config(&config).unwrap();
        assert_eq!(table, MappingTable::default_layout());
    }

    #[test]
    fn digital_config_parses_from_toml() {
        let text = r#"
            turntable_mode = "digital"

            [buttons]
            B1 = 3
            TT_Left = 12
            TT_Right = 13
        "#;
        let config: MappingConfig = toml::from_str(text).unwrap();
        let table = MappingTable::from_config(&config).unwrap();
        assert_eq!(table.turntable_mode(), TurntableMode::Digital);
        assert_eq!(table.button_index(LogicalControl::B1), Some(3));
        assert_eq!(table.button_index(LogicalControl::TtRight), Some(13));
        assert_eq!(table.axes().count(), 0);
    }
}
