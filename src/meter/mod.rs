//! Performance meter derived from the decoded controller state
//!
//! [`deriver::EventDeriver`] compares consecutive frames and produces a
//! [`output::MeterOutput`] snapshot: pressed keys and their glow, turntable
//! direction, total notes, notes in the last second and the average length of
//! short key releases.

pub mod deriver;
pub mod output;
pub mod stats;

pub use deriver::{EventDeriver, MeterSettings};
pub use output::{KeyGlow, MeterOutput, PlaySide, TurntableDirection};
