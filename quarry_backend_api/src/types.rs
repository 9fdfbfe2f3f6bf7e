use serde::{Deserialize, Serialize};

/// Signature attached to a raw commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    /// Display name recorded by the backend.
    pub name: String,
    /// Email address; empty when none was recorded.
    #[serde(default)]
    pub email: String,
    /// Seconds since the Unix epoch.
    pub time: i64,
    /// Offset from UTC in minutes, positive east of Greenwich.
    #[serde(default)]
    pub offset_minutes: i32,
}

impl RawSignature {
    /// Construct a signature with explicit timing information.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        time: i64,
        offset_minutes: i32,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            time,
            offset_minutes,
        }
    }
}

/// A commit as reported by the backend, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    /// Full hexadecimal commit identifier.
    pub hash: String,
    /// Who wrote the change.
    pub author: RawSignature,
    /// Who recorded the change.
    pub committer: RawSignature,
    /// Full commit message, untrimmed.
    #[serde(default)]
    pub message: String,
    /// Parent hashes in recorded order.
    #[serde(default)]
    pub parents: Vec<String>,
}

/// Change hints the backend attaches to a per-file diff entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffFlags {
    /// File only exists in the post-image.
    #[serde(default)]
    pub is_new: bool,
    /// File only exists in the pre-image.
    #[serde(default)]
    pub is_deleted: bool,
    /// File moved between paths.
    #[serde(default)]
    pub is_renamed: bool,
    /// File copied from another path. Only some backends report this.
    #[serde(default)]
    pub is_copied: bool,
}

/// One changed path between a commit and its diff base.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawFileDiff {
    /// Path in the pre-image, if the file existed there.
    #[serde(default)]
    pub old_path: Option<String>,
    /// Path in the post-image, if the file exists there.
    #[serde(default)]
    pub new_path: Option<String>,
    /// Classification hints.
    #[serde(default)]
    pub flags: DiffFlags,
    /// Raw patch bytes for this file.
    #[serde(default)]
    pub diff: Vec<u8>,
    /// Post-image blob content; absent for deletions or unreadable blobs.
    #[serde(default)]
    pub post_image: Option<Vec<u8>>,
}

/// Errors surfaced by backend adapters.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No commit matches the requested hash.
    #[error("commit '{hash}' not found")]
    CommitNotFound {
        /// Hash that failed to resolve.
        hash: String,
    },
    /// No tag with the requested name points at a commit.
    #[error("tag '{tag}' not found")]
    TagNotFound {
        /// Tag name that failed to resolve.
        tag: String,
    },
    /// The repository or one of its objects could not be read.
    #[error("repository unreadable: {message}")]
    Unreadable {
        /// Human-readable description from the backend.
        message: String,
    },
}

impl BackendError {
    /// Helper to construct an [`BackendError::Unreadable`] from any message.
    #[must_use]
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::Unreadable {
            message: message.into(),
        }
    }
}

/// Convenience result alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
