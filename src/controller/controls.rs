//! Logical controls of a 7-key turntable controller
//!
//! Raw HID indices are resolved to these identifiers once, when the
//! [`MappingTable`](super::mapping::MappingTable) is built. Everything after that
//! works on the closed enumeration instead of string keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of playable keys
pub const MAIN_KEY_COUNT: usize = 7;

/// Number of auxiliary (effector) keys
pub const AUX_KEY_COUNT: usize = 4;

/// Every control the mapping table can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogicalControl {
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    E1,
    E2,
    E3,
    E4,
    TurntableAxis,
    TtLeft,
    TtRight,
}

/// Whether a control is read from the button array or the axis array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Button,
    Axis,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Button => write!(f, "button"),
            ControlKind::Axis => write!(f, "axis"),
        }
    }
}

impl LogicalControl {
    pub const MAIN_KEYS: [LogicalControl; MAIN_KEY_COUNT] = [
        LogicalControl::B1,
        LogicalControl::B2,
        LogicalControl::B3,
        LogicalControl::B4,
        LogicalControl::B5,
        LogicalControl::B6,
        LogicalControl::B7,
    ];

    pub const ALL: [LogicalControl; 14] = [
        LogicalControl::B1,
        LogicalControl::B2,
        LogicalControl::B3,
        LogicalControl::B4,
        LogicalControl::B5,
        LogicalControl::B6,
        LogicalControl::B7,
        LogicalControl::E1,
        LogicalControl::E2,
        LogicalControl::E3,
        LogicalControl::E4,
        LogicalControl::TurntableAxis,
        LogicalControl::TtLeft,
        LogicalControl::TtRight,
    ];

    pub const AUX_KEYS: [LogicalControl; AUX_KEY_COUNT] = [
        LogicalControl::E1,
        LogicalControl::E2,
        LogicalControl::E3,
        LogicalControl::E4,
    ];

    pub fn kind(self) -> ControlKind {
        match self {
            LogicalControl::TurntableAxis => ControlKind::Axis,
            _ => ControlKind::Button,
        }
    }

    /// Position among the main keys, `None` for anything else
    pub fn main_key_index(self) -> Option<usize> {
        Self::MAIN_KEYS.iter().position(|key| *key == self)
    }

    /// Position among the auxiliary keys, `None` for anything else
    pub fn aux_key_index(self) -> Option<usize> {
        Self::AUX_KEYS.iter().position(|key| *key == self)
    }
}

impl fmt::Display for LogicalControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalControl::TtLeft => write!(f, "TT_Left"),
            LogicalControl::TtRight => write!(f, "TT_Right"),
            other => write!(f, "{:?}", other),
        }
    }
}

impl FromStr for LogicalControl {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|control| control.to_string() == name)
            .copied()
            .ok_or_else(|| format!("unknown control name '{}'", name))
    }
}

impl TryFrom<String> for LogicalControl {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<LogicalControl> for String {
    fn from(control: LogicalControl) -> Self {
        control.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_indices_follow_declaration_order() {
        assert_eq!(LogicalControl::B1.main_key_index(), Some(0));
        assert_eq!(LogicalControl::B7.main_key_index(), Some(6));
        assert_eq!(LogicalControl::E3.aux_key_index(), Some(2));
        assert_eq!(LogicalControl::E3.main_key_index(), None);
        assert_eq!(LogicalControl::TtLeft.aux_key_index(), None);
    }

    #[test]
    fn only_the_turntable_axis_is_an_axis() {
        assert_eq!(LogicalControl::TurntableAxis.kind(), ControlKind::Axis);
        assert_eq!(LogicalControl::TtRight.kind(), ControlKind::Button);
        assert_eq!(LogicalControl::E4.kind(), ControlKind::Button);
    }

    #[test]
    fn display_uses_config_names() {
        assert_eq!(LogicalControl::TtLeft.to_string(), "TT_Left");
        assert_eq!(LogicalControl::B3.to_string(), "B3");
        assert_eq!(LogicalControl::TurntableAxis.to_string(), "TurntableAxis");
    }

    #[test]
    fn names_parse_back() {
        for control in LogicalControl::ALL {
            assert_eq!(control.to_string().parse::<LogicalControl>(), Ok(control));
        }
        assert!("B8".parse::<LogicalControl>().is_err());
    }
}
