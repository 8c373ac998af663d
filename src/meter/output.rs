//! Per-tick output snapshot consumed by the display layer

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::controller::{AUX_KEY_COUNT, MAIN_KEY_COUNT};

/// Colour a main key is lit with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGlow {
    /// Resting colour of odd-numbered keys (1, 3, 5, 7)
    White,
    /// Resting colour of even-numbered keys (2, 4, 6)
    Blue,
    /// Key held past the glow threshold
    Hit,
}

impl KeyGlow {
    /// Keys alternate between the two resting colours by index parity
    pub fn resting(index: usize) -> Self {
        if index % 2 == 0 {
            KeyGlow::White
        } else {
            KeyGlow::Blue
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurntableDirection {
    #[default]
    Idle,
    Upper,
    Lower,
}

/// Which side of the cabinet the player stands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaySide {
    #[default]
    #[serde(rename = "1p")]
    P1,
    #[serde(rename = "2p")]
    P2,
}

impl PlaySide {
    /// The 1P wheel sits left of the keys and turns the opposite way
    pub fn mirrors_turntable(self) -> bool {
        self == PlaySide::P1
    }
}

impl fmt::Display for PlaySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaySide::P1 => write!(f, "1P"),
            PlaySide::P2 => write!(f, "2P"),
        }
    }
}

/// Everything the display reads after a tick
#[derive(Debug, Clone, PartialEq)]
pub struct MeterOutput {
    pub keys: [bool; MAIN_KEY_COUNT],
    pub glow: [KeyGlow; MAIN_KEY_COUNT],
    pub aux_keys: [bool; AUX_KEY_COUNT],
    /// Degrees in `[0, 360)`
    pub turntable_angle: f64,
    pub turntable: TurntableDirection,
    pub total_notes: u64,
    pub notes_per_second: usize,
    pub average_release_ms: u32,
}

impl MeterOutput {
    pub fn turntable_upper(&self) -> bool {
        self.turntable == TurntableDirection::Upper
    }

    pub fn turntable_lower(&self) -> bool {
        self.turntable == TurntableDirection::Lower
    }
}

impl Default for MeterOutput {
    fn default() -> Self {
        Self {
            keys: [false; MAIN_KEY_COUNT],
            glow: std::array::from_fn(KeyGlow::resting),
            aux_keys: [false; AUX_KEY_COUNT],
            turntable_angle: 0.0,
            turntable: TurntableDirection::Idle,
            total_notes: 0,
            notes_per_second: 0,
            average_release_ms: 0,
        }
    }
}

impl fmt::Display for MeterOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: String = self
            .keys
            .iter()
            .map(|pressed| if *pressed { '#' } else { '.' })
            .collect();
        let turntable = match self.turntable {
            TurntableDirection::Idle => '-',
            TurntableDirection::Upper => '^',
            TurntableDirection::Lower => 'v',
        };
        write!(
            f,
            "[{}] TT {} {:5.1}° total {} nps {} release {}ms",
            keys,
            turntable,
            self.turntable_angle,
            self.total_notes,
            self.notes_per_second,
            self.average_release_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_colours_alternate() {
        let output = MeterOutput::default();
        assert_eq!(
            output.glow,
            [
                KeyGlow::White,
                KeyGlow::Blue,
                KeyGlow::White,
                KeyGlow::Blue,
                KeyGlow::White,
                KeyGlow::Blue,
                KeyGlow::White,
            ]
        );
    }

    #[test]
    fn play_side_names_in_config() {
        #[derive(Deserialize)]
        struct Wrapper {
            side: PlaySide,
        }
        let parsed: Wrapper = toml::from_str(r#"side = "2p""#).unwrap();
        assert_eq!(parsed.side, PlaySide::P2);
        assert!(PlaySide::P1.mirrors_turntable());
        assert!(!PlaySide::P2.mirrors_turntable());
    }

    #[test]
    fn display_summarises_the_snapshot() {
        let mut output = MeterOutput::default();
        output.keys[0] = true;
        output.keys[6] = true;
        output.turntable = TurntableDirection::Upper;
        output.total_notes = 12;
        assert_eq!(
            output.to_string(),
            "[#.....#] TT ^   0.0° total 12 nps 0 release 0ms"
        );
    }
}
