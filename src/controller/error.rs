//! Error definitions for the controller module

use thiserror::Error;

use super::controls::{ControlKind, LogicalControl};

/// Errors raised while building a [`MappingTable`](super::mapping::MappingTable)
///
/// Only construction can fail. Once a table exists, reading a sample never does.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// A control was placed in the table of the wrong kind
    #[error("{control} is a {expected} control but was mapped as {found}")]
    WrongKind {
        control: LogicalControl,
        expected: ControlKind,
        found: ControlKind,
    },
}
