//! GitBackend — a thin, typed façade over an installed `git` executable.
//!
//! Each operation runs `git` with a fixed working directory, captures stdout
//! and stderr as text, and returns a structured result. This keeps the entire
//! Git layer behind a single adapter ([`GitBackend`]) so that higher-level
//! code (see [`crate::package::PackageRepo`], [`crate::resolver::Resolver`])
//! never shells out directly.

pub mod error;
pub use error::GitError;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Captured result of a single `git` invocation.
#[derive(Debug, Clone)]
struct CommandOutput {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A process-launching adapter over the `git` executable, bound to a single
/// on-disk working directory (a [`crate::package::PackageRepo`]'s clone path).
#[derive(Debug, Clone)]
pub struct GitBackend {
    path: PathBuf,
}

impl GitBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `git <args>` in this backend's working directory, returning raw output.
    fn run(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        Self::run_in(&self.path, args)
    }

    /// Run `git <args>` in an arbitrary directory. Used by probes like
    /// [`GitBackend::is_git_repo`] and [`GitBackend::clone`] that act on a
    /// source/destination before any working directory exists yet.
    fn run_in(dir: &Path, args: &[&str]) -> Result<CommandOutput, GitError> {
        log::debug!("$ git {} [{}]", args.join(" "), dir.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| GitError::Spawn {
                args: args.iter().map(|s| s.to_string()).collect(),
                error: e.to_string(),
            })?;
        Ok(CommandOutput::from_output(output))
    }

    fn require_success(args: &[&str], output: CommandOutput) -> Result<CommandOutput, GitError> {
        if output.success {
            Ok(output)
        } else {
            Err(GitError::CommandFailed {
                args: args.iter().map(|s| s.to_string()).collect(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }

    /// `git ls-remote --exit-code <path>` — probes both remote URLs and
    /// on-disk clones uniformly.
    pub fn is_git_repo(path: &Path) -> bool {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path_str = path.to_string_lossy().into_owned();
        matches!(
            Self::run_in(&cwd, &["ls-remote", "--exit-code", &path_str]),
            Ok(out) if out.success
        )
    }

    /// `git clone --no-checkout <source> <dest>`.
    pub fn clone(source: &str, dest: &Path) -> Result<(), GitError> {
        if let Some(parent) = dest.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let dest_str = dest.to_string_lossy().into_owned();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let args = ["clone", "--no-checkout", source, dest_str.as_str()];
        let output = Self::run_in(&cwd, &args)?;
        if output.success {
            return Ok(());
        }
        if output.stderr.trim_start().starts_with("fatal: repository")
            && output.stderr.trim_end().ends_with("does not exist")
        {
            return Err(GitError::BadSource {
                source: source.to_string(),
            });
        }
        Err(GitError::CommandFailed {
            args: args.iter().map(|s| s.to_string()).collect(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// `git fetch <source>` followed by `git fetch --all`. Succeeds iff the
    /// first fetch succeeded; the `--all` pass is best-effort (it's there so
    /// a later `rev-parse origin/<branch>` works when `source` was a local
    /// path rather than the configured `origin`).
    pub fn fetch(&self, source: &str) -> Result<(), GitError> {
        let output = self.run(&["fetch", source])?;
        let _ = self.run(&["fetch", "--all"]);
        if output.success {
            return Ok(());
        }
        if output
            .stderr
            .contains("does not appear to be a git repository")
        {
            return Err(GitError::BadSource {
                source: source.to_string(),
            });
        }
        Err(GitError::CommandFailed {
            args: vec!["fetch".into(), source.into()],
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Resolve `rev` to a commit hash, retrying with `origin/<rev>` once.
    pub fn rev_parse(&self, rev: &str) -> Result<String, GitError> {
        let output = self.run(&["rev-parse", rev])?;
        if output.success {
            return Ok(output.stdout.trim().to_string());
        }
        let qualified = format!("origin/{rev}");
        let output = self.run(&["rev-parse", &qualified])?;
        if output.success {
            return Ok(output.stdout.trim().to_string());
        }
        Err(GitError::CommitNotFound {
            revision: rev.to_string(),
        })
    }

    /// `git cat-file -t <hash>` — confirms a hash actually exists. Needed
    /// because `rev-parse` can report success on an absent short hash.
    pub fn has_commit(&self, hash: &str) -> Result<bool, GitError> {
        Ok(self.run(&["cat-file", "-t", hash])?.success)
    }

    /// `git merge-base --is-ancestor <ancestor> <descendant>`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        Ok(self
            .run(&["merge-base", "--is-ancestor", ancestor, descendant])?
            .success)
    }

    /// Committer epoch seconds of `hash`.
    pub fn commit_time(&self, hash: &str) -> Result<i64, GitError> {
        let args = ["log", "-n1", "--format=%ct", hash];
        let output = Self::require_success(&args, self.run(&args)?)?;
        output
            .stdout
            .trim()
            .parse::<i64>()
            .map_err(|_| GitError::CommandFailed {
                args: args.iter().map(|s| s.to_string()).collect(),
                exit_code: None,
                stdout: output.stdout,
                stderr: String::new(),
            })
    }

    /// `git show <revision>:<path>` — empty payload if the path is absent at
    /// that revision (a leaf package has no `wit-manifest.json`).
    pub fn show_blob(&self, revision: &str, path: &str) -> Result<Vec<u8>, GitError> {
        let spec = format!("{revision}:{path}");
        let output = self.run(&["show", &spec])?;
        if output.success {
            Ok(output.stdout.into_bytes())
        } else {
            Ok(Vec::new())
        }
    }

    /// URL of `origin`.
    pub fn remote_url(&self) -> Result<String, GitError> {
        let args = ["remote", "get-url", "origin"];
        let output = Self::require_success(&args, self.run(&args)?)?;
        Ok(output.stdout.trim().to_string())
    }

    /// `HEAD`'s commit hash.
    pub fn head_commit(&self) -> Result<String, GitError> {
        self.rev_parse("HEAD")
    }

    /// `git checkout <revision>`.
    pub fn checkout(&self, revision: &str) -> Result<(), GitError> {
        let args = ["checkout", revision];
        Self::require_success(&args, self.run(&args)?)?;
        Ok(())
    }

    /// `git status --porcelain`.
    pub fn status_porcelain(&self) -> Result<String, GitError> {
        let args = ["status", "--porcelain"];
        let output = Self::require_success(&args, self.run(&args)?)?;
        Ok(output.stdout)
    }
}

/// Fail fast with a clear message if `git` isn't on `PATH`, rather than
/// letting the first clone/fetch report a raw "No such file or directory".
pub fn require_git_installed() -> Result<(), GitError> {
    which::which("git")
        .map(|_| ())
        .map_err(|_| GitError::NotInstalled)
}

/// True iff `s` is exactly 40 lowercase hex characters — the shape a
/// [`crate::lockfile::LockEntry`]'s `commit` field must always have.
pub fn is_full_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hash_detection() {
        assert!(is_full_hash(&"a".repeat(40)));
        assert!(is_full_hash("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_full_hash("ABCDEF0123456789abcdef0123456789abcdef01"));
        assert!(!is_full_hash("short"));
        assert!(!is_full_hash(&"a".repeat(41)));
    }

    #[test]
    fn is_git_repo_rejects_non_repo_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!GitBackend::is_git_repo(dir.path()));
    }
}
