//! Core library for quarry's commit-history mining.
//!
//! The crate is layered around three primary responsibilities:
//! - wrapping backend commits in a lazily evaluated [`Commit`] model
//! - resolving per-commit diffs into [`Modification`] values
//! - reconciling mining filters and traversing history in a stable order

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Lazily evaluated commit model.
pub mod commit;
/// Conversion of backend diffs into modifications.
pub mod diff;
/// Filter reconciliation and ordered traversal.
pub mod mining;
/// libgit2-backed repository adapter.
pub mod repository;

pub use commit::Commit;
pub use mining::{
    Commits, FilterConflict, InvalidTimeBound, MiningOptions, RepositoryMining, TimeBound,
};
pub use quarry_api::{ChangeType, Developer, DiffLine, Modification, ParsedDiff};
pub use quarry_backend_api::{Backend, BackendError};
pub use repository::GitBackend;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mining options combine filters that cannot be used together.
    #[error("invalid mining configuration: {}", mining::describe_conflicts(.0))]
    Configuration(Vec<FilterConflict>),
    /// The backend failed to answer a history query.
    #[error("backend error: {source}")]
    Backend {
        /// Original error reported by the backend adapter.
        #[from]
        source: BackendError,
    },
    /// Underlying git operation failed while opening a repository.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error.
        #[from]
        source: git2::Error,
    },
    /// Provided path does not correspond to a git repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// A commit carries a timestamp that cannot be represented.
    #[error("commit {hash} has an invalid timestamp ({seconds}s at {offset_minutes}min offset)")]
    InvalidTimestamp {
        /// Commit carrying the timestamp.
        hash: String,
        /// Seconds since the Unix epoch.
        seconds: i64,
        /// Offset from UTC in minutes.
        offset_minutes: i32,
    },
    /// The backend described a file change whose paths contradict its type.
    #[error("commit {hash} has a malformed file change: {source}")]
    MalformedChange {
        /// Commit the change belongs to.
        hash: String,
        /// Validation failure from the modification model.
        #[source]
        source: quarry_api::ModificationError,
    },
}
