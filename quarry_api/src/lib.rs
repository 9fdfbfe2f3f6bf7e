//! Shared quarry data models consumed by the mining core and backend adapters.

pub mod developer;
pub mod diff;
pub mod modification;

pub use developer::Developer;
pub use diff::{parse_diff, DiffLine, ParsedDiff};
pub use modification::{ChangeType, Modification, ModificationError, NULL_DEVICE};
