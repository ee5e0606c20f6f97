//! Command-line surface: argument parsing only. Dispatch lives in
//! [`crate::commands`].

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "wit", version, about = "A workspace-oriented source-package manager")]
pub struct Cli {
    /// Run as if started in this directory instead of the current one.
    #[arg(short = 'C', long = "chdir", value_name = "PATH", global = true)]
    pub chdir: Option<PathBuf>,

    /// Extra directory to search for existing package clones by name;
    /// may be given multiple times. Prepended ahead of the workspace's own
    /// store and any `WIT_REPO_PATH` environment variable.
    #[arg(long = "repo-path", value_name = "DIR", global = true)]
    pub repo_path: Vec<PathBuf>,

    /// Upper bound on concurrent clone/fetch operations during a resolve.
    #[arg(short = 'j', long = "jobs", value_name = "N", default_value_t = 1, global = true)]
    pub jobs: usize,

    /// Increase log verbosity; may be repeated (`-v`, `-vv`).
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new, empty workspace in the given directory (default: the current one).
    Init {
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Resolve the root manifest and check out every package at its selected commit.
    Update,
    /// Report each package's clean/dirty/untracked/missing condition.
    Status,
    /// Add a new dependency to a package's manifest.
    AddDep {
        source: String,
        #[arg(long)]
        commit: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Manifest to edit; defaults to the workspace root.
        #[arg(long, value_name = "DIR")]
        package: Option<PathBuf>,
    },
    /// Change an existing dependency's source and/or commit.
    UpdateDep {
        name: String,
        #[arg(long)]
        commit: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, value_name = "DIR")]
        package: Option<PathBuf>,
    },
    /// Run a command in every package's working directory.
    Foreach {
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Re-check out every package from the existing lockfile, without resolving again.
    Restore,
}
