#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use quarry_core::{Backend, BackendError};
use quarry_backend_api::{BackendResult, DiffFlags, RawCommit, RawFileDiff, RawSignature};

/// Backend call recorded by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Commit(String),
    Tag(String),
    Branches(String),
    Diff(String),
}

/// In-memory history with a shared call log.
#[derive(Default)]
pub struct ScriptedBackend {
    commits: Vec<RawCommit>,
    tags: HashMap<String, String>,
    branches: HashMap<String, Vec<String>>,
    diffs: HashMap<String, Vec<RawFileDiff>>,
    failing_diff: Option<String>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit; commits must be pushed oldest first.
    pub fn commit(mut self, hash: &str, time: i64, parents: &[&str]) -> Self {
        let signature = RawSignature::new("Ada Lovelace", "ada@example.com", time, 0);
        self.commits.push(RawCommit {
            hash: hash.to_owned(),
            author: signature.clone(),
            committer: signature,
            message: format!("commit {hash}\n"),
            parents: parents.iter().map(|p| (*p).to_owned()).collect(),
        });
        self
    }

    pub fn tag(mut self, name: &str, hash: &str) -> Self {
        self.tags.insert(name.to_owned(), hash.to_owned());
        self
    }

    pub fn branches(mut self, hash: &str, names: &[&str]) -> Self {
        self.branches
            .insert(hash.to_owned(), names.iter().map(|n| (*n).to_owned()).collect());
        self
    }

    pub fn touches(mut self, hash: &str, paths: &[&str]) -> Self {
        let entries = paths
            .iter()
            .map(|path| RawFileDiff {
                old_path: Some((*path).to_owned()),
                new_path: Some((*path).to_owned()),
                flags: DiffFlags::default(),
                diff: b"@@ -1 +1 @@\n-old\n+new\n".to_vec(),
                post_image: Some(b"new\n".to_vec()),
            })
            .collect();
        self.diffs.insert(hash.to_owned(), entries);
        self
    }

    pub fn failing_diff(mut self, hash: &str) -> Self {
        self.failing_diff = Some(hash.to_owned());
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("call log").push(call);
    }

    fn find(&self, hash: &str) -> Option<RawCommit> {
        self.commits.iter().find(|c| c.hash == hash).cloned()
    }
}

impl Backend for ScriptedBackend {
    fn location(&self) -> &str {
        "scripted"
    }

    fn list_commits(&self) -> BackendResult<Vec<RawCommit>> {
        self.record(Call::List);
        Ok(self.commits.iter().rev().cloned().collect())
    }

    fn commit(&self, hash: &str) -> BackendResult<RawCommit> {
        self.record(Call::Commit(hash.to_owned()));
        self.find(hash).ok_or_else(|| BackendError::CommitNotFound {
            hash: hash.to_owned(),
        })
    }

    fn commit_from_tag(&self, tag: &str) -> BackendResult<RawCommit> {
        self.record(Call::Tag(tag.to_owned()));
        self.tags
            .get(tag)
            .and_then(|hash| self.find(hash))
            .ok_or_else(|| BackendError::TagNotFound {
                tag: tag.to_owned(),
            })
    }

    fn branches_containing(&self, hash: &str) -> BackendResult<Vec<String>> {
        self.record(Call::Branches(hash.to_owned()));
        Ok(self.branches.get(hash).cloned().unwrap_or_default())
    }

    fn diff_against_first_parent_or_root(
        &self,
        commit: &RawCommit,
    ) -> BackendResult<Vec<RawFileDiff>> {
        self.record(Call::Diff(commit.hash.clone()));
        if self.failing_diff.as_deref() == Some(commit.hash.as_str()) {
            return Err(BackendError::unreadable("object missing"));
        }
        Ok(self.diffs.get(&commit.hash).cloned().unwrap_or_default())
    }
}

pub fn shared(backend: ScriptedBackend) -> Arc<dyn Backend> {
    Arc::new(backend)
}

pub fn hashes<I>(commits: I) -> Vec<String>
where
    I: IntoIterator<Item = quarry_core::Result<quarry_core::Commit>>,
{
    commits
        .into_iter()
        .map(|commit| commit.expect("commit").hash().to_owned())
        .collect()
}
