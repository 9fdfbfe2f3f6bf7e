mod engine;
mod options;

pub use engine::{Commits, RepositoryMining};
pub(crate) use options::describe_conflicts;
pub use options::{
    FilterConflict, InvalidTimeBound, MiningOptions, TimeBound, DEFAULT_MAIN_BRANCH,
};
