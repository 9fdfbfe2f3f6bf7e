use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Branch used by [`MiningOptions::only_in_main_branch`] unless overridden.
pub const DEFAULT_MAIN_BRANCH: &str = "master";

/// A date filter bound, with or without a timezone.
///
/// Bounds without a timezone are interpreted as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBound {
    /// Timestamp carrying an explicit offset.
    Zoned(DateTime<FixedOffset>),
    /// Wall-clock timestamp without an offset.
    Naive(NaiveDateTime),
}

impl TimeBound {
    /// Resolve the bound to a zoned timestamp, treating naive values as UTC.
    #[must_use]
    pub fn to_zoned(self) -> DateTime<FixedOffset> {
        match self {
            Self::Zoned(date) => date,
            Self::Naive(date) => Utc.from_utc_datetime(&date).into(),
        }
    }
}

impl From<DateTime<FixedOffset>> for TimeBound {
    fn from(date: DateTime<FixedOffset>) -> Self {
        Self::Zoned(date)
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Zoned(date.into())
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(date: NaiveDateTime) -> Self {
        Self::Naive(date)
    }
}

/// Text that could not be read as a [`TimeBound`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}': expected RFC 3339, YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD")]
pub struct InvalidTimeBound(pub String);

impl FromStr for TimeBound {
    type Err = InvalidTimeBound;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let input = input.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::Zoned(date));
        }
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(date) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self::Naive(date));
            }
        }
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(Self::Naive)
            .ok_or_else(|| InvalidTimeBound(input.to_owned()))
    }
}

/// A pair of filters that cannot be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterConflict {
    /// A single commit was requested together with a range filter.
    SingleWithRange,
    /// Both a since date and a starting commit were given.
    SinceWithFromCommit,
    /// Both a to date and an ending commit were given.
    ToWithToCommit,
    /// A starting tag was combined with a since date or starting commit.
    FromTagWithLowerBound,
    /// An ending tag was combined with a to date or ending commit.
    ToTagWithUpperBound,
}

impl fmt::Display for FilterConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SingleWithRange => "a single commit cannot be combined with other filters",
            Self::SinceWithFromCommit => "cannot specify both <since date> and <from commit>",
            Self::ToWithToCommit => "cannot specify both <to date> and <to commit>",
            Self::FromTagWithLowerBound => {
                "cannot specify <since date> or <from commit> when using <from tag>"
            }
            Self::ToTagWithUpperBound => {
                "cannot specify <to date> or <to commit> when using <to tag>"
            }
        })
    }
}

/// Filters and ordering for one mining run.
///
/// Build with the chained setters, then hand to
/// [`RepositoryMining::new`](super::RepositoryMining::new), which rejects
/// conflicting combinations before touching the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningOptions {
    /// Hash of the only commit to yield.
    pub single: Option<String>,
    /// Earliest author date to include.
    pub since: Option<TimeBound>,
    /// Latest author date to include.
    pub to: Option<TimeBound>,
    /// Commit whose author date becomes the lower bound.
    pub from_commit: Option<String>,
    /// Commit whose author date becomes the upper bound.
    pub to_commit: Option<String>,
    /// Tag whose commit's author date becomes the lower bound.
    pub from_tag: Option<String>,
    /// Tag whose commit's author date becomes the upper bound.
    pub to_tag: Option<String>,
    /// Yield newest commits first instead of oldest first.
    pub reversed_order: bool,
    /// Skip commits the main branch does not contain.
    pub only_in_main_branch: bool,
    /// Name of the main branch.
    pub main_branch: String,
    /// Skip commits none of these branches contain.
    pub only_in_branches: Option<BTreeSet<String>>,
    /// Skip commits that touch no file ending with one of these suffixes.
    pub only_file_types: Option<Vec<String>>,
    /// Skip merge commits.
    pub only_no_merge: bool,
}

impl Default for MiningOptions {
    fn default() -> Self {
        Self {
            single: None,
            since: None,
            to: None,
            from_commit: None,
            to_commit: None,
            from_tag: None,
            to_tag: None,
            reversed_order: false,
            only_in_main_branch: false,
            main_branch: DEFAULT_MAIN_BRANCH.to_owned(),
            only_in_branches: None,
            only_file_types: None,
            only_no_merge: false,
        }
    }
}

impl MiningOptions {
    /// Options that yield every commit, oldest first.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield only the commit with this hash.
    #[must_use]
    pub fn single(mut self, hash: impl Into<String>) -> Self {
        self.single = Some(hash.into());
        self
    }

    /// Include commits authored at or after `date`.
    #[must_use]
    pub fn since(mut self, date: impl Into<TimeBound>) -> Self {
        self.since = Some(date.into());
        self
    }

    /// Include commits authored at or before `date`.
    #[must_use]
    pub fn to(mut self, date: impl Into<TimeBound>) -> Self {
        self.to = Some(date.into());
        self
    }

    /// Start from the author date of the commit `hash`.
    #[must_use]
    pub fn from_commit(mut self, hash: impl Into<String>) -> Self {
        self.from_commit = Some(hash.into());
        self
    }

    /// Stop at the author date of the commit `hash`.
    #[must_use]
    pub fn to_commit(mut self, hash: impl Into<String>) -> Self {
        self.to_commit = Some(hash.into());
        self
    }

    /// Start from the author date of the commit tagged `tag`.
    #[must_use]
    pub fn from_tag(mut self, tag: impl Into<String>) -> Self {
        self.from_tag = Some(tag.into());
        self
    }

    /// Stop at the author date of the commit tagged `tag`.
    #[must_use]
    pub fn to_tag(mut self, tag: impl Into<String>) -> Self {
        self.to_tag = Some(tag.into());
        self
    }

    /// Yield newest commits first.
    #[must_use]
    pub fn reversed_order(mut self, reversed: bool) -> Self {
        self.reversed_order = reversed;
        self
    }

    /// Only yield commits contained in the main branch.
    #[must_use]
    pub fn only_in_main_branch(mut self, enabled: bool) -> Self {
        self.only_in_main_branch = enabled;
        self
    }

    /// Name the branch [`MiningOptions::only_in_main_branch`] refers to.
    #[must_use]
    pub fn main_branch(mut self, name: impl Into<String>) -> Self {
        self.main_branch = name.into();
        self
    }

    /// Only yield commits contained in at least one of `branches`.
    #[must_use]
    pub fn only_in_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_in_branches = Some(branches.into_iter().map(Into::into).collect());
        self
    }

    /// Only yield commits touching a file whose name ends with one of
    /// `suffixes` (for example `".py"`).
    #[must_use]
    pub fn only_file_types<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_file_types = Some(suffixes.into_iter().map(Into::into).collect());
        self
    }

    /// Skip merge commits.
    #[must_use]
    pub fn only_no_merge(mut self, enabled: bool) -> Self {
        self.only_no_merge = enabled;
        self
    }

    /// Every illegal filter combination present in these options.
    #[must_use]
    pub fn conflicts(&self) -> Vec<FilterConflict> {
        let mut conflicts = Vec::new();

        let has_range = self.since.is_some()
            || self.to.is_some()
            || self.from_commit.is_some()
            || self.to_commit.is_some()
            || self.from_tag.is_some()
            || self.to_tag.is_some();
        if self.single.is_some() && has_range {
            conflicts.push(FilterConflict::SingleWithRange);
        }
        if self.from_commit.is_some() && self.since.is_some() {
            conflicts.push(FilterConflict::SinceWithFromCommit);
        }
        if self.to_commit.is_some() && self.to.is_some() {
            conflicts.push(FilterConflict::ToWithToCommit);
        }
        if self.from_tag.is_some() && (self.since.is_some() || self.from_commit.is_some()) {
            conflicts.push(FilterConflict::FromTagWithLowerBound);
        }
        if self.to_tag.is_some() && (self.to.is_some() || self.to_commit.is_some()) {
            conflicts.push(FilterConflict::ToTagWithUpperBound);
        }

        conflicts
    }

    /// Reject illegal filter combinations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] listing every conflict found.
    pub fn validate(&self) -> Result<()> {
        let conflicts = self.conflicts();
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(conflicts))
        }
    }
}

/// Render conflicts as a single `; `-separated reason.
pub(crate) fn describe_conflicts(conflicts: &[FilterConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
