mod types;

pub use types::{BackendError, BackendResult, DiffFlags, RawCommit, RawFileDiff, RawSignature};

/// Read-only access to a version-controlled repository's history.
///
/// Every call may be slow (it can touch the object database), so callers
/// should not assume results are cached between unrelated commits.
pub trait Backend: Send + Sync {
    /// Human-readable location of the repository, used for logging.
    fn location(&self) -> &str;

    /// List every commit reachable from the current head, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository history cannot be read.
    fn list_commits(&self) -> BackendResult<Vec<RawCommit>>;

    /// Resolve a commit by its (possibly abbreviated) hash.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CommitNotFound`] when no commit matches.
    fn commit(&self, hash: &str) -> BackendResult<RawCommit>;

    /// Resolve the commit a tag points at.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::TagNotFound`] when the tag does not exist or
    /// does not peel to a commit.
    fn commit_from_tag(&self, tag: &str) -> BackendResult<RawCommit>;

    /// Names of every branch containing the commit.
    ///
    /// Names are reported the way `git branch --contains` prints them: the
    /// checked-out branch may carry a leading `* ` marker and surrounding
    /// whitespace is allowed.
    ///
    /// # Errors
    ///
    /// Returns an error when branch references cannot be enumerated.
    fn branches_containing(&self, hash: &str) -> BackendResult<Vec<String>>;

    /// Per-file changes of `commit` against its first parent, or against the
    /// empty tree when it has no parents. Entries keep backend order.
    ///
    /// # Errors
    ///
    /// Returns an error when either tree or any patch cannot be read.
    fn diff_against_first_parent_or_root(&self, commit: &RawCommit)
        -> BackendResult<Vec<RawFileDiff>>;
}
