//! Git error types and formatting.
//!
//! These are the "design kinds" from the error taxonomy: plain enums with
//! hand-written [`Display`] impls rather than a derive-macro error crate.

use crate::styling::{ERROR, ERROR_EMOJI};

/// Errors raised by [`super::GitBackend`] and the lower-level `git` subprocess
/// adapter. These carry only the information a single `git` invocation has
/// access to (a source string, a revision spec, raw command output); callers
/// that know the dependency *name* involved (the [`crate::package::PackageRepo`]
/// and [`crate::resolver::Resolver`]) wrap these with that context.
#[derive(Debug)]
pub enum GitError {
    /// `clone`/`fetch` detected a non-existent or non-repository source.
    BadSource { source: String },
    /// `rev_parse` failed both directly and via `origin/<ref>`.
    CommitNotFound { revision: String },
    /// Any other non-zero subprocess exit.
    CommandFailed {
        args: Vec<String>,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// Failed to spawn the `git` executable at all (not installed, no PATH entry, ...).
    Spawn { args: Vec<String>, error: String },
    /// No `git` executable found on `PATH` at all, detected before any subprocess ran.
    NotInstalled,
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::BadSource { source } => {
                write!(f, "{ERROR_EMOJI} {ERROR}bad remote: {source}{ERROR:#}")
            }
            GitError::CommitNotFound { revision } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}could not find commit or reference '{revision}'{ERROR:#}"
                )
            }
            GitError::CommandFailed {
                args,
                exit_code,
                stdout,
                stderr,
            } => {
                let code = exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}command [git {}] exited with status [{code}]{ERROR:#}\nstdout: [{}]\nstderr: [{}]",
                    args.join(" "),
                    stdout.trim(),
                    stderr.trim(),
                )
            }
            GitError::Spawn { args, error } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}failed to execute [git {}]: {error}{ERROR:#}",
                    args.join(" ")
                )
            }
            GitError::NotInstalled => {
                write!(f, "{ERROR_EMOJI} {ERROR}'git' was not found on PATH{ERROR:#}")
            }
        }
    }
}

impl std::error::Error for GitError {}
