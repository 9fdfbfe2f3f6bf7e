use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::{self, ParsedDiff};

/// Path sentinel some diff producers emit for the missing side of a change.
pub const NULL_DEVICE: &str = "/dev/null";

/// Classification of a file change within a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// File only exists after the commit.
    Add,
    /// File content copied from another location.
    Copy,
    /// File path changed, with or without content changes.
    Rename,
    /// File only exists before the commit.
    Delete,
    /// File exists on both sides with differing content.
    Modify,
}

impl ChangeType {
    /// Upper-case label used in human-readable output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Copy => "COPY",
            Self::Rename => "RENAME",
            Self::Delete => "DELETE",
            Self::Modify => "MODIFY",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected combination of paths and change type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModificationError {
    /// A change type that needs the pre-image path was given none.
    #[error("{change_type} modification requires an old path")]
    MissingOldPath {
        /// Classification that was requested.
        change_type: ChangeType,
    },
    /// A change type that needs the post-image path was given none.
    #[error("{change_type} modification requires a new path")]
    MissingNewPath {
        /// Classification that was requested.
        change_type: ChangeType,
    },
}

/// The change to one file within a single commit.
///
/// Values are immutable once built; the counts and filename are derived from
/// the stored fields on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    #[serde(default)]
    old_path: Option<String>,
    #[serde(default)]
    new_path: Option<String>,
    change_type: ChangeType,
    #[serde(default)]
    diff: String,
    #[serde(default)]
    source_code: String,
}

impl Modification {
    /// Build a modification, checking that the paths fit the change type.
    ///
    /// Additions may omit `old_path`, deletions may omit `new_path`; every
    /// other change type needs both.
    ///
    /// # Errors
    ///
    /// Returns [`ModificationError`] when a required path is absent.
    pub fn new(
        old_path: Option<String>,
        new_path: Option<String>,
        change_type: ChangeType,
        diff: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Result<Self, ModificationError> {
        let needs_old = change_type != ChangeType::Add;
        let needs_new = change_type != ChangeType::Delete;
        if needs_old && old_path.is_none() {
            return Err(ModificationError::MissingOldPath { change_type });
        }
        if needs_new && new_path.is_none() {
            return Err(ModificationError::MissingNewPath { change_type });
        }

        Ok(Self {
            old_path,
            new_path,
            change_type,
            diff: diff.into(),
            source_code: source_code.into(),
        })
    }

    /// Path before the change; absent for additions.
    #[must_use]
    pub fn old_path(&self) -> Option<&str> {
        self.old_path.as_deref()
    }

    /// Path after the change; absent for deletions.
    #[must_use]
    pub fn new_path(&self) -> Option<&str> {
        self.new_path.as_deref()
    }

    /// How the file changed.
    #[must_use]
    pub const fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Unified diff text for the file; empty when it could not be decoded.
    #[must_use]
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// Post-change file content.
    ///
    /// Empty when unavailable (deleted, binary, or not valid UTF-8), which
    /// callers should not confuse with an empty file.
    #[must_use]
    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    /// Last path segment of the new path, falling back to the old path.
    #[must_use]
    pub fn filename(&self) -> &str {
        let path = match self.new_path.as_deref() {
            Some(path) if path != NULL_DEVICE => path,
            _ => self.old_path.as_deref().unwrap_or_default(),
        };
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Number of added lines in the diff.
    ///
    /// Any line starting with `+++` is treated as a file header here, even
    /// inside a hunk, so an added line whose content begins with `++` is not
    /// counted. [`Modification::parsed_diff`] tracks hunks and does list it.
    #[must_use]
    pub fn added_lines(&self) -> usize {
        diff::count_added(&self.diff)
    }

    /// Number of removed lines in the diff.
    ///
    /// Lines starting with `---` are skipped the same way as in
    /// [`Modification::added_lines`].
    #[must_use]
    pub fn removed_lines(&self) -> usize {
        diff::count_removed(&self.diff)
    }

    /// Added and deleted lines keyed by their line numbers.
    #[must_use]
    pub fn parsed_diff(&self) -> ParsedDiff {
        diff::parse_diff(&self.diff)
    }
}

impl fmt::Display for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MODIFICATION")?;
        writeln!(f, "Old Path: {}", self.old_path().unwrap_or("-"))?;
        writeln!(f, "New Path: {}", self.new_path().unwrap_or("-"))?;
        writeln!(f, "Type: {}", self.change_type)?;
        writeln!(
            f,
            "Lines: +{} -{}",
            self.added_lines(),
            self.removed_lines()
        )?;
        write!(f, "Diff: {}", self.diff)
    }
}
