#![allow(dead_code)]

use std::fs;
use std::path::Path;

use git2::{
    build::CheckoutBuilder, IndexAddOption, Oid, Repository as GitRepository,
    RepositoryInitOptions, Signature, Time,
};
use quarry_core::{Error, Result};

pub fn init(path: &Path) -> Result<GitRepository> {
    let mut options = RepositoryInitOptions::new();
    options.initial_head("master");
    GitRepository::init_opts(path, &options).map_err(Error::from)
}

pub fn commit_all(repo: &GitRepository, message: &str, time: i64) -> Result<Oid> {
    let parents = match repo.head() {
        Ok(reference) => vec![reference.peel_to_commit().map_err(Error::from)?],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    commit_with_parents(repo, message, time, parent_refs.as_slice())
}

pub fn commit_with_parents(
    repo: &GitRepository,
    message: &str,
    time: i64,
    parents: &[&git2::Commit],
) -> Result<Oid> {
    commit_as(repo, message, &Time::new(time, 0), parents)
}

pub fn commit_as(
    repo: &GitRepository,
    message: &str,
    when: &Time,
    parents: &[&git2::Commit],
) -> Result<Oid> {
    let mut index = repo.index().map_err(Error::from)?;
    index
        .add_all(["*"], IndexAddOption::DEFAULT, None)
        .map_err(Error::from)?;
    index.update_all(["*"], None).map_err(Error::from)?;
    index.write().map_err(Error::from)?;
    let tree_id = index.write_tree().map_err(Error::from)?;
    let tree = repo.find_tree(tree_id).map_err(Error::from)?;
    let signature = Signature::new("Test User", "test@example.com", when).map_err(Error::from)?;

    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        parents,
    )
    .map_err(Error::from)
}

pub fn switch_branch(repo: &GitRepository, name: &str) -> Result<()> {
    repo.set_head(&format!("refs/heads/{name}"))
        .map_err(Error::from)?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout)).map_err(Error::from)
}

pub fn write_file(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
    fs::create_dir_all(
        path.as_ref()
            .parent()
            .expect("path should have a parent directory"),
    )
    .expect("create directories");
    fs::write(path, contents).expect("write file");
}
