//! Read-only view over one backend commit.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, FixedOffset, TimeZone};
use quarry_api::{Developer, Modification};
use quarry_backend_api::{Backend, RawCommit, RawSignature};

use crate::{diff, Error, Result};

/// Marker `git branch` prints in front of the checked-out branch.
const CURRENT_BRANCH_MARKER: &str = "* ";

/// A commit yielded by the mining engine.
///
/// Identity, authorship and dates are resolved on construction. Branch
/// membership and modifications require further backend queries, so they are
/// computed on first access and cached for the lifetime of this instance only.
pub struct Commit {
    raw: RawCommit,
    backend: Arc<dyn Backend>,
    main_branch: Arc<str>,
    author: Developer,
    committer: Developer,
    author_date: DateTime<FixedOffset>,
    committer_date: DateTime<FixedOffset>,
    branches: OnceLock<BTreeSet<String>>,
    modifications: OnceLock<Vec<Modification>>,
}

impl Commit {
    /// Wrap a raw backend commit.
    ///
    /// `main_branch` names the branch [`Commit::in_main_branch`] checks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTimestamp`] when either signature carries a
    /// time or offset outside the representable range.
    pub fn new(
        raw: RawCommit,
        backend: Arc<dyn Backend>,
        main_branch: impl Into<Arc<str>>,
    ) -> Result<Self> {
        let author_date = signature_date(&raw.hash, &raw.author)?;
        let committer_date = signature_date(&raw.hash, &raw.committer)?;

        Ok(Self {
            author: developer(&raw.author),
            committer: developer(&raw.committer),
            author_date,
            committer_date,
            raw,
            backend,
            main_branch: main_branch.into(),
            branches: OnceLock::new(),
            modifications: OnceLock::new(),
        })
    }

    /// Full commit hash.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.raw.hash
    }

    /// Who wrote the change.
    #[must_use]
    pub const fn author(&self) -> &Developer {
        &self.author
    }

    /// Who recorded the change.
    #[must_use]
    pub const fn committer(&self) -> &Developer {
        &self.committer
    }

    /// Authored timestamp in the author's own offset.
    #[must_use]
    pub const fn author_date(&self) -> DateTime<FixedOffset> {
        self.author_date
    }

    /// Committed timestamp in the committer's own offset.
    #[must_use]
    pub const fn committer_date(&self) -> DateTime<FixedOffset> {
        self.committer_date
    }

    /// Author offset in seconds west of UTC.
    #[must_use]
    pub const fn author_timezone(&self) -> i32 {
        -self.raw.author.offset_minutes * 60
    }

    /// Committer offset in seconds west of UTC.
    #[must_use]
    pub const fn committer_timezone(&self) -> i32 {
        -self.raw.committer.offset_minutes * 60
    }

    /// Commit message without surrounding whitespace.
    #[must_use]
    pub fn message(&self) -> &str {
        self.raw.message.trim()
    }

    /// Parent hashes in recorded order.
    #[must_use]
    pub fn parents(&self) -> &[String] {
        &self.raw.parents
    }

    /// Whether the commit has more than one parent.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.raw.parents.len() > 1
    }

    /// Names of every branch containing this commit.
    ///
    /// # Errors
    ///
    /// Propagates backend failures on first access.
    pub fn branches(&self) -> Result<&BTreeSet<String>> {
        if let Some(branches) = self.branches.get() {
            return Ok(branches);
        }

        let branches = self
            .backend
            .branches_containing(&self.raw.hash)?
            .iter()
            .map(|name| normalize_branch(name))
            .filter(|name| !name.is_empty())
            .collect();
        Ok(self.branches.get_or_init(|| branches))
    }

    /// Whether the configured main branch contains this commit.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Commit::branches`].
    pub fn in_main_branch(&self) -> Result<bool> {
        Ok(self.branches()?.contains(&*self.main_branch))
    }

    /// Per-file changes against the first parent, or the empty tree for a
    /// root commit.
    ///
    /// # Errors
    ///
    /// Propagates backend failures on first access. Files whose diff or
    /// content cannot be decoded do not fail; their text fields are empty.
    pub fn modifications(&self) -> Result<&[Modification]> {
        if let Some(modifications) = self.modifications.get() {
            return Ok(modifications);
        }

        let modifications = diff::resolve_modifications(self.backend.as_ref(), &self.raw)?;
        Ok(self.modifications.get_or_init(|| modifications))
    }
}

/// Convert a raw signature time into a zoned timestamp.
pub(crate) fn signature_date(
    hash: &str,
    signature: &RawSignature,
) -> Result<DateTime<FixedOffset>> {
    let invalid = || Error::InvalidTimestamp {
        hash: hash.to_owned(),
        seconds: signature.time,
        offset_minutes: signature.offset_minutes,
    };

    let offset = signature
        .offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(invalid)?;
    offset
        .timestamp_opt(signature.time, 0)
        .single()
        .ok_or_else(invalid)
}

fn developer(signature: &RawSignature) -> Developer {
    Developer::new(signature.name.clone(), signature.email.clone())
}

fn normalize_branch(name: &str) -> String {
    let name = name.trim();
    name.strip_prefix(CURRENT_BRANCH_MARKER)
        .unwrap_or(name)
        .trim()
        .to_owned()
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hash: {}", self.hash())?;
        writeln!(f, "Author: {}", self.author)?;
        writeln!(f, "Committer: {}", self.committer)?;
        writeln!(
            f,
            "Author date: {}",
            self.author_date.format("%Y-%m-%d %H:%M:%S %:z")
        )?;
        writeln!(
            f,
            "Committer date: {}",
            self.committer_date.format("%Y-%m-%d %H:%M:%S %:z")
        )?;
        writeln!(f, "Message: {}", self.message())?;
        writeln!(f, "Parents: {}", self.raw.parents.join(", "))?;
        write!(f, "Merge: {}", self.is_merge())
    }
}

impl fmt::Debug for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("hash", &self.raw.hash)
            .field("author_date", &self.author_date)
            .field("parents", &self.raw.parents)
            .finish_non_exhaustive()
    }
}
