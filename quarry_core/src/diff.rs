//! Conversion of backend per-file diffs into [`Modification`] values.

use quarry_api::{ChangeType, Modification};
use quarry_backend_api::{Backend, RawCommit, RawFileDiff};
use tracing::debug;

use crate::{Error, Result};

/// Resolve the modifications of `commit` through `backend`.
///
/// Entries keep the order the backend reported them in. A file whose diff or
/// post-image cannot be decoded as UTF-8 still yields a modification, with
/// the undecodable field left empty.
///
/// # Errors
///
/// Propagates backend failures, and rejects entries whose paths contradict
/// their classification.
pub fn resolve_modifications(
    backend: &dyn Backend,
    commit: &RawCommit,
) -> Result<Vec<Modification>> {
    let entries = backend.diff_against_first_parent_or_root(commit)?;
    entries
        .into_iter()
        .map(|entry| to_modification(&commit.hash, entry))
        .collect()
}

/// Classify a backend diff entry.
///
/// Backend hints win in the order added, deleted, renamed, copied; anything
/// else present on both sides counts as a modification.
#[must_use]
pub const fn classify(entry: &RawFileDiff) -> ChangeType {
    let flags = entry.flags;
    if flags.is_new {
        ChangeType::Add
    } else if flags.is_deleted {
        ChangeType::Delete
    } else if flags.is_renamed {
        ChangeType::Rename
    } else if flags.is_copied {
        ChangeType::Copy
    } else {
        ChangeType::Modify
    }
}

fn to_modification(hash: &str, entry: RawFileDiff) -> Result<Modification> {
    let change_type = classify(&entry);
    let path = entry
        .new_path
        .as_deref()
        .or(entry.old_path.as_deref())
        .unwrap_or_default()
        .to_owned();

    let old_path = match change_type {
        ChangeType::Add => None,
        _ => entry.old_path,
    };
    let new_path = match change_type {
        ChangeType::Delete => None,
        _ => entry.new_path,
    };
    let diff = decode(hash, &path, "diff", Some(entry.diff));
    let source_code = decode(hash, &path, "source code", entry.post_image);

    Modification::new(old_path, new_path, change_type, diff, source_code).map_err(|source| {
        Error::MalformedChange {
            hash: hash.to_owned(),
            source,
        }
    })
}

fn decode(hash: &str, path: &str, what: &str, bytes: Option<Vec<u8>>) -> String {
    let Some(bytes) = bytes else {
        return String::new();
    };
    String::from_utf8(bytes).unwrap_or_else(|err| {
        debug!(
            commit = hash,
            path,
            "could not decode {what}: {}",
            err.utf8_error()
        );
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use quarry_backend_api::DiffFlags;

    use super::*;

    fn entry(flags: DiffFlags) -> RawFileDiff {
        RawFileDiff {
            old_path: Some("src/old.py".into()),
            new_path: Some("src/new.py".into()),
            flags,
            diff: b"@@ -1 +1 @@\n-a\n+b\n".to_vec(),
            post_image: Some(b"b\n".to_vec()),
        }
    }

    #[test]
    fn classification_prefers_addition_and_deletion_hints() {
        let added = entry(DiffFlags {
            is_new: true,
            is_renamed: true,
            ..DiffFlags::default()
        });
        assert_eq!(classify(&added), ChangeType::Add);

        let deleted = entry(DiffFlags {
            is_deleted: true,
            ..DiffFlags::default()
        });
        assert_eq!(classify(&deleted), ChangeType::Delete);

        let renamed = entry(DiffFlags {
            is_renamed: true,
            ..DiffFlags::default()
        });
        assert_eq!(classify(&renamed), ChangeType::Rename);

        let copied = entry(DiffFlags {
            is_copied: true,
            ..DiffFlags::default()
        });
        assert_eq!(classify(&copied), ChangeType::Copy);

        assert_eq!(classify(&entry(DiffFlags::default())), ChangeType::Modify);
    }

    #[test]
    fn addition_drops_old_path_and_deletion_drops_new_path() {
        let added = to_modification(
            "abc",
            entry(DiffFlags {
                is_new: true,
                ..DiffFlags::default()
            }),
        )
        .expect("addition");
        assert_eq!(added.old_path(), None);
        assert_eq!(added.new_path(), Some("src/new.py"));

        let deleted = to_modification(
            "abc",
            RawFileDiff {
                post_image: None,
                ..entry(DiffFlags {
                    is_deleted: true,
                    ..DiffFlags::default()
                })
            },
        )
        .expect("deletion");
        assert_eq!(deleted.new_path(), None);
        assert_eq!(deleted.filename(), "old.py");
        assert!(deleted.source_code().is_empty());
    }

    #[test]
    fn undecodable_fields_become_empty_independently() {
        let binary = RawFileDiff {
            diff: vec![0xff, 0xfe, 0x00],
            ..entry(DiffFlags::default())
        };
        let modification = to_modification("abc", binary).expect("modification");

        assert!(modification.diff().is_empty());
        assert_eq!(modification.source_code(), "b\n");
    }

    #[test]
    fn rename_without_old_path_is_malformed() {
        let broken = RawFileDiff {
            old_path: None,
            ..entry(DiffFlags {
                is_renamed: true,
                ..DiffFlags::default()
            })
        };
        let err = to_modification("abc", broken);
        assert!(matches!(err, Err(Error::MalformedChange { .. })));
    }
}
