use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use quarry_core::{ChangeType, Commit, Developer, MiningOptions, RepositoryMining, TimeBound};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(version, about = "Mine and filter the commit history of a git repository", long_about = None)]
struct Cli {
    /// Repository to mine (any path inside it works)
    #[arg(default_value = ".")]
    path: Utf8PathBuf,

    /// Only visit the commit with this full hash
    #[arg(long)]
    single: Option<String>,

    /// Lower author-date bound (RFC 3339 or YYYY-MM-DD[THH:MM:SS], naive dates are UTC)
    #[arg(long)]
    since: Option<TimeBound>,

    /// Upper author-date bound
    #[arg(long)]
    to: Option<TimeBound>,

    /// Start at the author date of this commit
    #[arg(long)]
    from_commit: Option<String>,

    /// Stop at the author date of this commit
    #[arg(long)]
    to_commit: Option<String>,

    /// Start at the author date of the commit this tag points at
    #[arg(long)]
    from_tag: Option<String>,

    /// Stop at the author date of the commit this tag points at
    #[arg(long)]
    to_tag: Option<String>,

    /// Visit commits newest first
    #[arg(long)]
    reversed: bool,

    /// Skip commits not contained in the main branch
    #[arg(long)]
    only_main_branch: bool,

    /// Name of the main branch
    #[arg(long, default_value = quarry_core::mining::DEFAULT_MAIN_BRANCH)]
    main_branch: String,

    /// Keep commits contained in this branch (repeatable)
    #[arg(long = "branch")]
    branches: Vec<String>,

    /// Keep commits touching a file with this suffix (repeatable)
    #[arg(long = "file-type")]
    file_types: Vec<String>,

    /// Skip merge commits
    #[arg(long)]
    no_merges: bool,
}

impl Cli {
    fn options(&self) -> MiningOptions {
        let mut options = MiningOptions::new()
            .reversed_order(self.reversed)
            .only_in_main_branch(self.only_main_branch)
            .main_branch(self.main_branch.clone())
            .only_no_merge(self.no_merges);
        options.single.clone_from(&self.single);
        options.since = self.since;
        options.to = self.to;
        options.from_commit.clone_from(&self.from_commit);
        options.to_commit.clone_from(&self.to_commit);
        options.from_tag.clone_from(&self.from_tag);
        options.to_tag.clone_from(&self.to_tag);
        if !self.branches.is_empty() {
            options = options.only_in_branches(self.branches.iter().cloned());
        }
        if !self.file_types.is_empty() {
            options = options.only_file_types(self.file_types.iter().cloned());
        }
        options
    }
}

#[derive(Serialize)]
struct CommitRecord<'a> {
    hash: &'a str,
    author: &'a Developer,
    author_date: String,
    author_timezone: i32,
    message: &'a str,
    merge: bool,
    modifications: Vec<ModificationRecord<'a>>,
}

#[derive(Serialize)]
struct ModificationRecord<'a> {
    filename: &'a str,
    change_type: ChangeType,
    added: usize,
    removed: usize,
}

fn record(commit: &Commit) -> Result<CommitRecord<'_>> {
    let modifications = commit
        .modifications()
        .with_context(|| format!("failed to resolve modifications of {}", commit.hash()))?
        .iter()
        .map(|modification| ModificationRecord {
            filename: modification.filename(),
            change_type: modification.change_type(),
            added: modification.added_lines(),
            removed: modification.removed_lines(),
        })
        .collect();

    Ok(CommitRecord {
        hash: commit.hash(),
        author: commit.author(),
        author_date: commit.author_date().to_rfc3339(),
        author_timezone: commit.author_timezone(),
        message: commit.message(),
        merge: commit.is_merge(),
        modifications,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quarry_core=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mining = RepositoryMining::open(&cli.path, cli.options())
        .with_context(|| format!("failed to prepare mining of {}", cli.path))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for commit in mining
        .traverse_commits()
        .with_context(|| format!("failed to list commits of {}", cli.path))?
    {
        let commit = commit.context("commit traversal failed")?;
        serde_json::to_writer(&mut out, &record(&commit)?).context("failed to encode commit")?;
        writeln!(out).context("failed to write output")?;
    }
    out.flush().context("failed to flush output")?;

    Ok(())
}
