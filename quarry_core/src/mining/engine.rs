use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::vec;

use chrono::{DateTime, FixedOffset};
use quarry_backend_api::{Backend, RawCommit};
use tracing::{debug, info};

use super::MiningOptions;
use crate::commit::{signature_date, Commit};
use crate::repository::GitBackend;
use crate::Result;

/// A validated mining run over one repository.
///
/// Construction reconciles every date, commit and tag filter into a single
/// `[since, to]` author-date window. Each call to
/// [`RepositoryMining::traverse_commits`] starts a fresh pass.
pub struct RepositoryMining {
    backend: Arc<dyn Backend>,
    single: Option<String>,
    since: Option<DateTime<FixedOffset>>,
    to: Option<DateTime<FixedOffset>>,
    reversed_order: bool,
    only_in_main_branch: bool,
    main_branch: Arc<str>,
    only_in_branches: Option<BTreeSet<String>>,
    only_file_types: Option<Vec<String>>,
    only_no_merge: bool,
}

impl RepositoryMining {
    /// Validate `options` and resolve their bounds against `backend`.
    ///
    /// Conflicting filters are rejected before the backend is queried at all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) for
    /// conflicting filters, or a backend error when a bounding commit or tag
    /// cannot be resolved.
    pub fn new(backend: Arc<dyn Backend>, options: MiningOptions) -> Result<Self> {
        options.validate()?;

        let mut since = options.since.map(super::TimeBound::to_zoned);
        let mut to = options.to.map(super::TimeBound::to_zoned);

        if let Some(hash) = &options.from_commit {
            since = Some(author_date(&backend.commit(hash)?)?);
        }
        if let Some(hash) = &options.to_commit {
            to = Some(author_date(&backend.commit(hash)?)?);
        }
        if let Some(tag) = &options.from_tag {
            since = Some(author_date(&backend.commit_from_tag(tag)?)?);
        }
        if let Some(tag) = &options.to_tag {
            to = Some(author_date(&backend.commit_from_tag(tag)?)?);
        }

        Ok(Self {
            backend,
            single: options.single,
            since,
            to,
            reversed_order: options.reversed_order,
            only_in_main_branch: options.only_in_main_branch,
            main_branch: options.main_branch.into(),
            only_in_branches: options.only_in_branches,
            only_file_types: options.only_file_types,
            only_no_merge: options.only_no_merge,
        })
    }

    /// Open the git repository containing `path` and prepare a mining run.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository cannot be opened or the options
    /// are rejected by [`RepositoryMining::new`].
    pub fn open(path: impl AsRef<Path>, options: MiningOptions) -> Result<Self> {
        options.validate()?;
        let backend = GitBackend::open(path)?;
        Self::new(Arc::new(backend), options)
    }

    /// Effective lower author-date bound after reconciliation.
    #[must_use]
    pub const fn since(&self) -> Option<DateTime<FixedOffset>> {
        self.since
    }

    /// Effective upper author-date bound after reconciliation.
    #[must_use]
    pub const fn to(&self) -> Option<DateTime<FixedOffset>> {
        self.to
    }

    /// Start a pass over the repository history.
    ///
    /// Commits come oldest first unless reversed order was requested. The
    /// returned iterator evaluates filters lazily; dropping it early stops
    /// all further backend work.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot list commits.
    pub fn traverse_commits(&self) -> Result<Commits<'_>> {
        info!(repository = self.backend.location(), "mining git repository");

        let mut pending = self.backend.list_commits()?;
        if !self.reversed_order {
            pending.reverse();
        }

        Ok(Commits {
            mining: self,
            pending: pending.into_iter(),
            finished: false,
        })
    }

    fn selects_by_date_or_hash(&self) -> bool {
        self.single.is_some() || self.since.is_some() || self.to.is_some()
    }

    fn in_window(&self, date: DateTime<FixedOffset>) -> bool {
        self.since.map_or(true, |since| since <= date) && self.to.map_or(true, |to| date <= to)
    }

    fn is_filtered(&self, commit: &Commit) -> Result<bool> {
        if self.only_in_main_branch && !commit.in_main_branch()? {
            debug!(commit = commit.hash(), "commit filtered for main branch");
            return Ok(true);
        }
        if let Some(branches) = &self.only_in_branches {
            if commit.branches()?.is_disjoint(branches) {
                debug!(commit = commit.hash(), "commit filtered for only in branches");
                return Ok(true);
            }
        }
        if let Some(suffixes) = &self.only_file_types {
            let touches_type = commit.modifications()?.iter().any(|modification| {
                let filename = modification.filename();
                suffixes.iter().any(|suffix| filename.ends_with(suffix.as_str()))
            });
            if !touches_type {
                debug!(commit = commit.hash(), "commit filtered for modification types");
                return Ok(true);
            }
        }
        if self.only_no_merge && commit.is_merge() {
            debug!(commit = commit.hash(), "commit filtered for no merge");
            return Ok(true);
        }
        Ok(false)
    }

    fn wrap(&self, raw: RawCommit) -> Result<Commit> {
        Commit::new(raw, Arc::clone(&self.backend), Arc::clone(&self.main_branch))
    }
}

impl fmt::Debug for RepositoryMining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryMining")
            .field("repository", &self.backend.location())
            .field("single", &self.single)
            .field("since", &self.since)
            .field("to", &self.to)
            .field("reversed_order", &self.reversed_order)
            .finish_non_exhaustive()
    }
}

/// Lazy, forward-only sequence of commits surviving every filter.
///
/// Yields `Err` at most once; a backend failure ends the pass.
pub struct Commits<'a> {
    mining: &'a RepositoryMining,
    pending: vec::IntoIter<RawCommit>,
    finished: bool,
}

impl Commits<'_> {
    fn next_candidate(&mut self) -> Option<Result<Commit>> {
        let mining = self.mining;
        if !mining.selects_by_date_or_hash() {
            return self.pending.next().map(|raw| mining.wrap(raw));
        }

        if let Some(single) = &mining.single {
            let found = self.pending.find(|raw| raw.hash == *single);
            // The selected commit is the whole result regardless of order.
            self.pending = Vec::new().into_iter();
            return found.map(|raw| mining.wrap(raw));
        }

        for raw in self.pending.by_ref() {
            let date = match signature_date(&raw.hash, &raw.author) {
                Ok(date) => date,
                Err(err) => return Some(Err(err)),
            };
            if mining.in_window(date) {
                return Some(mining.wrap(raw));
            }
        }
        None
    }
}

impl Iterator for Commits<'_> {
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let commit = match self.next_candidate()? {
                Ok(commit) => commit,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };

            info!(
                commit = commit.hash(),
                date = %commit.author_date(),
                author = %commit.author().name,
                "visiting commit"
            );

            match self.mining.is_filtered(&commit) {
                Ok(true) => info!(commit = commit.hash(), "commit filtered"),
                Ok(false) => return Some(Ok(commit)),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl fmt::Debug for Commits<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commits")
            .field("remaining", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn author_date(raw: &RawCommit) -> Result<DateTime<FixedOffset>> {
    signature_date(&raw.hash, &raw.author)
}
