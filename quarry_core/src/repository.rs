//! [`Backend`] implementation over a local repository through libgit2.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use git2::{
    BranchType, Delta, DiffFindOptions, DiffOptions, ErrorClass, ErrorCode, Oid, Patch,
    Repository as GitRepository, Sort,
};
use quarry_backend_api::{
    Backend, BackendError, BackendResult, DiffFlags, RawCommit, RawFileDiff, RawSignature,
};
use tracing::debug;

use crate::{Error, Result};

/// History access for a repository on the local filesystem.
///
/// libgit2 handles are not shareable between threads, so every query goes
/// through an internal lock.
pub struct GitBackend {
    inner: Mutex<GitRepository>,
    root: PathBuf,
    location: String,
}

impl GitBackend {
    /// Open the repository containing `path`.
    ///
    /// Discovery walks up from `path`, so any directory inside a working tree
    /// works. Bare repositories are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be canonicalized, does not resolve
    /// to a git repository, or libgit2 fails to open it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let original = path.as_ref();
        let canonical = std::fs::canonicalize(original).map_err(|source| Error::Io {
            path: display_path(original),
            source,
        })?;

        let repo = match GitRepository::discover(&canonical) {
            Ok(repo) => repo,
            Err(err)
                if err.class() == ErrorClass::Repository && err.code() == ErrorCode::NotFound =>
            {
                return Err(Error::NotARepository {
                    path: display_path(&canonical),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };

        let root = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        let location = display_path(&root);

        Ok(Self {
            inner: Mutex::new(repo),
            root,
            location,
        })
    }

    /// Absolute path of the working tree, or of the git directory when bare.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo(&self) -> BackendResult<MutexGuard<'_, GitRepository>> {
        self.inner
            .lock()
            .map_err(|_| BackendError::unreadable("repository handle poisoned"))
    }
}

impl Backend for GitBackend {
    fn location(&self) -> &str {
        &self.location
    }

    fn list_commits(&self) -> BackendResult<Vec<RawCommit>> {
        let repo = self.repo()?;
        if let Err(err) = repo.head() {
            return match (err.class(), err.code()) {
                (ErrorClass::Reference, ErrorCode::NotFound | ErrorCode::UnbornBranch) => {
                    Ok(Vec::new())
                }
                _ => Err(unreadable(&err)),
            };
        }

        let mut walk = repo.revwalk().map_err(|err| unreadable(&err))?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(|err| unreadable(&err))?;
        walk.push_head().map_err(|err| unreadable(&err))?;

        let commits = walk
            .map(|oid| {
                let oid = oid.map_err(|err| unreadable(&err))?;
                let commit = repo.find_commit(oid).map_err(|err| unreadable(&err))?;
                Ok(raw_commit(&commit))
            })
            .collect();
        commits
    }

    fn commit(&self, hash: &str) -> BackendResult<RawCommit> {
        let repo = self.repo()?;
        let not_found = |_| BackendError::CommitNotFound {
            hash: hash.to_owned(),
        };
        let commit = repo
            .revparse_single(hash)
            .and_then(|object| object.peel_to_commit())
            .map_err(not_found)?;
        Ok(raw_commit(&commit))
    }

    fn commit_from_tag(&self, tag: &str) -> BackendResult<RawCommit> {
        let repo = self.repo()?;
        let not_found = |_| BackendError::TagNotFound {
            tag: tag.to_owned(),
        };
        let commit = repo
            .find_reference(&format!("refs/tags/{tag}"))
            .and_then(|reference| reference.peel_to_commit())
            .map_err(not_found)?;
        Ok(raw_commit(&commit))
    }

    fn branches_containing(&self, hash: &str) -> BackendResult<Vec<String>> {
        let repo = self.repo()?;
        let target = Oid::from_str(hash).map_err(|_| BackendError::CommitNotFound {
            hash: hash.to_owned(),
        })?;

        let mut names = Vec::new();
        for entry in repo
            .branches(Some(BranchType::Local))
            .map_err(|err| unreadable(&err))?
        {
            let (branch, _) = entry.map_err(|err| unreadable(&err))?;
            let Some(tip) = branch.get().target() else {
                continue;
            };
            let contains = tip == target
                || repo
                    .graph_descendant_of(tip, target)
                    .map_err(|err| unreadable(&err))?;
            if !contains {
                continue;
            }

            let name = match branch.name() {
                Ok(Some(name)) => name.to_owned(),
                _ => String::from_utf8_lossy(branch.get().name_bytes())
                    .trim_start_matches("refs/heads/")
                    .to_owned(),
            };
            if branch.is_head() {
                names.push(format!("* {name}"));
            } else {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn diff_against_first_parent_or_root(
        &self,
        commit: &RawCommit,
    ) -> BackendResult<Vec<RawFileDiff>> {
        let repo = self.repo()?;
        let oid = Oid::from_str(&commit.hash).map_err(|_| BackendError::CommitNotFound {
            hash: commit.hash.clone(),
        })?;
        let current = repo
            .find_commit(oid)
            .map_err(|_| BackendError::CommitNotFound {
                hash: commit.hash.clone(),
            })?;

        let tree = current.tree().map_err(|err| unreadable(&err))?;
        let parent_tree = if current.parent_count() == 0 {
            None
        } else {
            let parent = current.parent(0).map_err(|err| unreadable(&err))?;
            Some(parent.tree().map_err(|err| unreadable(&err))?)
        };

        let mut options = DiffOptions::new();
        options.include_unmodified(true);
        let mut diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut options))
            .map_err(|err| unreadable(&err))?;
        let mut similarity = DiffFindOptions::new();
        similarity
            .renames(true)
            .copies(true)
            .copies_from_unmodified(true)
            .remove_unmodified(true);
        diff.find_similar(Some(&mut similarity))
            .map_err(|err| unreadable(&err))?;

        let mut entries = Vec::new();
        for (index, delta) in diff.deltas().enumerate() {
            let status = delta.status();
            if status == Delta::Unmodified {
                continue;
            }
            let old_path = delta
                .old_file()
                .path()
                .map(|path| path.to_string_lossy().into_owned());
            let new_path = delta
                .new_file()
                .path()
                .map(|path| path.to_string_lossy().into_owned());

            let patch = match Patch::from_diff(&diff, index).map_err(|err| unreadable(&err))? {
                Some(mut patch) => patch_text(&mut patch).map_err(|err| unreadable(&err))?,
                None => Vec::new(),
            };

            let post_image = if status == Delta::Deleted {
                None
            } else {
                post_image(&repo, delta.new_file().id(), new_path.as_deref())
            };

            entries.push(RawFileDiff {
                old_path,
                new_path,
                flags: DiffFlags {
                    is_new: status == Delta::Added,
                    is_deleted: status == Delta::Deleted,
                    is_renamed: status == Delta::Renamed,
                    is_copied: status == Delta::Copied,
                },
                diff: patch,
                post_image,
            });
        }
        Ok(entries)
    }
}

fn raw_commit(commit: &git2::Commit<'_>) -> RawCommit {
    RawCommit {
        hash: commit.id().to_string(),
        author: raw_signature(&commit.author()),
        committer: raw_signature(&commit.committer()),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        parents: commit.parent_ids().map(|oid| oid.to_string()).collect(),
    }
}

fn raw_signature(signature: &git2::Signature<'_>) -> RawSignature {
    let when = signature.when();
    RawSignature::new(
        String::from_utf8_lossy(signature.name_bytes()),
        String::from_utf8_lossy(signature.email_bytes()),
        when.seconds(),
        when.offset_minutes(),
    )
}

/// Render the hunks of a patch without its file header.
fn patch_text(patch: &mut Patch<'_>) -> std::result::Result<Vec<u8>, git2::Error> {
    let mut text = Vec::new();
    patch.print(&mut |_delta, _hunk, line| {
        let content = line.content();
        match line.origin() {
            'F' | 'B' => {}
            origin @ ('+' | '-' | ' ') => {
                text.push(origin as u8);
                text.extend_from_slice(content);
            }
            _ => text.extend_from_slice(content),
        }
        true
    })?;
    Ok(text)
}

fn post_image(repo: &GitRepository, id: Oid, path: Option<&str>) -> Option<Vec<u8>> {
    if id.is_zero() {
        return None;
    }
    match repo.find_blob(id) {
        Ok(blob) if blob.is_binary() => None,
        Ok(blob) => Some(blob.content().to_vec()),
        Err(err) => {
            debug!(path, "could not read blob {id}: {err}");
            None
        }
    }
}

fn unreadable(err: &git2::Error) -> BackendError {
    BackendError::unreadable(err.message())
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl fmt::Debug for GitBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitBackend")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Repository as GitRepository};
    use tempfile::TempDir;

    #[test]
    fn unborn_head_lists_no_commits() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        GitRepository::init(temp.path())?;

        let backend = GitBackend::open(temp.path())?;
        assert!(backend.list_commits()?.is_empty());

        Ok(())
    }

    #[test]
    fn commits_are_listed_newest_first() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;

        write_file(temp.path().join("file.txt"), "one\n");
        let first = stage_and_commit(&git_repo, "first", 1_600_000_000)?;
        write_file(temp.path().join("file.txt"), "two\n");
        let second = stage_and_commit(&git_repo, "second\n\nbody\n", 1_600_000_100)?;

        let backend = GitBackend::open(temp.path())?;
        let commits = backend.list_commits()?;

        let hashes: Vec<_> = commits.iter().map(|c| c.hash.clone()).collect();
        assert_eq!(hashes, vec![second.to_string(), first.to_string()]);
        assert_eq!(commits[0].parents, vec![first.to_string()]);
        assert_eq!(commits[0].message, "second\n\nbody\n");
        assert_eq!(commits[0].author.offset_minutes, -300);
        assert_eq!(commits[1].author.time, 1_600_000_000);

        Ok(())
    }

    #[test]
    fn abbreviated_hash_resolves_to_full_commit() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;

        write_file(temp.path().join("file.txt"), "one\n");
        let oid = stage_and_commit(&git_repo, "first", 1_600_000_000)?;

        let backend = GitBackend::open(temp.path())?;
        let full = oid.to_string();
        let resolved = backend.commit(&full[..8])?;
        assert_eq!(resolved.hash, full);

        let missing = backend.commit("0000000000000000000000000000000000000000");
        assert!(matches!(missing, Err(BackendError::CommitNotFound { .. })));

        Ok(())
    }

    #[test]
    fn patch_text_has_no_file_header() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let git_repo = GitRepository::init(temp.path())?;

        write_file(temp.path().join("file.txt"), "one\ntwo\n");
        stage_and_commit(&git_repo, "first", 1_600_000_000)?;
        write_file(temp.path().join("file.txt"), "one\nthree");
        stage_and_commit(&git_repo, "second", 1_600_000_100)?;

        let backend = GitBackend::open(temp.path())?;
        let head = backend.list_commits()?.remove(0);
        let entries = backend.diff_against_first_parent_or_root(&head)?;

        assert_eq!(entries.len(), 1);
        let text = String::from_utf8(entries[0].diff.clone()).expect("utf-8 diff");
        assert!(text.starts_with("@@ -1,2 +1,2 @@"), "{text}");
        assert!(!text.contains("+++"));
        assert!(text.contains("-two\n"));
        assert!(text.contains("+three"));
        assert!(text.contains("\\ No newline at end of file"));
        assert_eq!(entries[0].post_image.as_deref(), Some(&b"one\nthree"[..]));

        Ok(())
    }

    fn stage_and_commit(repo: &GitRepository, message: &str, time: i64) -> Result<Oid> {
        let mut index = repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let signature =
            git2::Signature::new("Test User", "test@example.com", &git2::Time::new(time, -300))?;

        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        Ok(repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            parent_refs.as_slice(),
        )?)
    }

    fn write_file(path: impl AsRef<Path>, contents: &str) {
        std::fs::write(path, contents).expect("write file");
    }
}
