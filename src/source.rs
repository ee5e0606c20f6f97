//! Source resolution — turning a manifest's `source` string into something
//! [`crate::git::GitBackend`] can clone or fetch, and finding existing
//! clones by package name under `repo_paths`.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable naming an extra, absolute directory to search for
/// existing package clones by name, ahead of the workspace's own `.wit` dir.
pub const REPO_PATH_ENV: &str = "WIT_REPO_PATH";

/// Directories searched, in order, for an existing clone named `name`:
/// `extra` (typically `--repo-path` flags, in the order given) first, then
/// `$WIT_REPO_PATH` (if set), then the workspace's own package store.
pub fn repo_paths(workspace_root: &Path, extra: &[PathBuf]) -> Result<Vec<PathBuf>> {
    repo_paths_from(workspace_root, extra, env::var(REPO_PATH_ENV).ok())
}

/// Same as [`repo_paths`], but takes the `$WIT_REPO_PATH` value directly
/// instead of reading it from the environment — lets tests exercise the
/// validation without mutating process-global environment state.
fn repo_paths_from(
    workspace_root: &Path,
    extra: &[PathBuf],
    repo_path_env: Option<String>,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    paths.extend(extra.iter().cloned());
    if let Some(raw) = repo_path_env {
        let path = PathBuf::from(&raw);
        if !path.is_absolute() {
            anyhow::bail!("{REPO_PATH_ENV}='{raw}' must be an absolute path");
        }
        paths.push(path);
    }
    paths.push(workspace_root.join(".wit"));
    Ok(paths)
}

/// Search `repo_paths(workspace_root, extra)` for an existing clone or
/// ls-remote-able repo named `name`. Returns the first hit, or `None` if no
/// candidate matches.
pub fn find_existing_clone(workspace_root: &Path, extra: &[PathBuf], name: &str) -> Result<Option<PathBuf>> {
    for dir in repo_paths(workspace_root, extra)? {
        let candidate = dir.join(name);
        if candidate.is_dir() && crate::git::GitBackend::is_git_repo(&candidate) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Apply the core's source-lookup policy: if `source` is not
/// already an absolute URL/path, check whether `name` already has a clone
/// under `repo_paths` — that clone's directory wins outright over the
/// declared source string. If none match, `source` is used verbatim; the
/// core does not perform the full external-interface resolution chain in
/// [`resolve_source`] (that belongs to the add-dep/update-dep commands).
pub fn resolve_source_with_repo_paths(
    name: &str,
    source: &str,
    workspace_root: &Path,
    extra_repo_paths: &[PathBuf],
) -> Result<String> {
    if !Path::new(source).is_absolute() && !is_url(source) {
        if let Some(found) = find_existing_clone(workspace_root, extra_repo_paths, name)? {
            return Ok(found.to_string_lossy().into_owned());
        }
    }
    Ok(source.to_string())
}

/// Resolve a manifest's `source` field against the workspace root, following
/// the external-interface resolution order:
///
/// 1. An already-absolute source (path or URL) is used verbatim.
/// 2. `<workspace_root>/<source>`, if it exists directly under the workspace
///    root — use that clone's `origin` remote URL.
/// 3. `<workspace_root>/.wit/<source>`, if it exists directly under `.wit` —
///    use that clone's `origin` remote URL.
/// 4. `<workspace_root>/<source>`, if it exists as any other path — resolve
///    to an absolute path.
/// 5. `source` joined onto the current working directory, if it exists —
///    resolve to an absolute path.
/// 6. Otherwise, `source` is returned unchanged and treated as a remote URL.
///
/// Used by `add-dep`/`update-dep` to freeze a relative source into something
/// stable at the moment a dependency is declared; the core resolver never
/// calls this (see [`resolve_source_with_repo_paths`]).
pub fn resolve_source(source: &str, workspace_root: &Path) -> Result<String> {
    if Path::new(source).is_absolute() || is_url(source) {
        return Ok(source.to_string());
    }

    let direct = workspace_root.join(source);
    if direct.exists() && direct.parent() == Some(workspace_root) {
        return crate::git::GitBackend::new(&direct)
            .remote_url()
            .with_context(|| format!("reading origin remote of '{}'", direct.display()));
    }

    let scratch_dir = workspace_root.join(".wit");
    let scratch_candidate = scratch_dir.join(source);
    if scratch_candidate.exists() && scratch_candidate.parent() == Some(scratch_dir.as_path()) {
        return crate::git::GitBackend::new(&scratch_candidate)
            .remote_url()
            .with_context(|| format!("reading origin remote of '{}'", scratch_candidate.display()));
    }

    if direct.exists() {
        return Ok(direct.to_string_lossy().into_owned());
    }

    let cwd_candidate = env::current_dir()
        .context("reading current working directory")?
        .join(source);
    if cwd_candidate.exists() {
        return Ok(cwd_candidate.to_string_lossy().into_owned());
    }

    Ok(source.to_string())
}

/// A source string is treated as a URL (rather than a filesystem path) if it
/// carries a scheme (`https://`, `git://`, `ssh://`) or an scp-like
/// `user@host:path` shorthand.
fn is_url(source: &str) -> bool {
    if source.contains("://") {
        return true;
    }
    if let Some((host_part, _)) = source.split_once(':') {
        if host_part.contains('@') && !host_part.contains('/') && !host_part.contains('\\') {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let abs = dir.path().join("whatever.git").to_string_lossy().into_owned();
        let resolved = resolve_source(&abs, dir.path()).unwrap();
        assert_eq!(resolved, abs);
    }

    #[test]
    fn urls_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://example.com/org/repo.git";
        assert_eq!(resolve_source(url, dir.path()).unwrap(), url);
        let scp = "git@example.com:org/repo.git";
        assert_eq!(resolve_source(scp, dir.path()).unwrap(), scp);
    }

    #[test]
    fn resolves_to_origin_remote_for_clone_directly_under_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        let clone = ws.join("sibling");
        std::fs::create_dir_all(&clone).unwrap();
        std::process::Command::new("git")
            .args(["init", "-q"])
            .current_dir(&clone)
            .status()
            .unwrap();
        std::process::Command::new("git")
            .args(["remote", "add", "origin", "https://example.com/org/sibling.git"])
            .current_dir(&clone)
            .status()
            .unwrap();

        let resolved = resolve_source("sibling", &ws).unwrap();
        assert_eq!(resolved, "https://example.com/org/sibling.git");
    }

    #[test]
    fn resolves_to_absolute_path_for_non_direct_workspace_match() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        let nested = ws.join("vendor").join("sibling.git");
        std::fs::create_dir_all(&nested).unwrap();

        let resolved = resolve_source("vendor/sibling.git", &ws).unwrap();
        assert_eq!(PathBuf::from(resolved), nested);
    }

    #[test]
    fn falls_back_to_verbatim_source_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_source("no-such-thing", dir.path()).unwrap();
        assert_eq!(resolved, "no-such-thing");
    }

    #[test]
    fn repo_path_lookup_wins_over_literal_source() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace_root = tmp.path().join("ws");
        std::fs::create_dir_all(&workspace_root).unwrap();

        let extra_dir = tmp.path().join("mirrors");
        let mirrored = extra_dir.join("foo");
        std::fs::create_dir_all(&mirrored).unwrap();
        let status = std::process::Command::new("git")
            .args(["init", "-q"])
            .current_dir(&mirrored)
            .status()
            .unwrap();
        assert!(status.success());

        let resolved = resolve_source_with_repo_paths(
            "foo",
            "some-literal-tag",
            &workspace_root,
            &[extra_dir],
        )
        .unwrap();
        assert_eq!(PathBuf::from(resolved), mirrored);
    }

    #[test]
    fn repo_path_lookup_skipped_for_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace_root = tmp.path().join("ws");
        std::fs::create_dir_all(&workspace_root).unwrap();
        let url = "https://example.com/org/foo.git";
        let resolved = resolve_source_with_repo_paths("foo", url, &workspace_root, &[]).unwrap();
        assert_eq!(resolved, url);
    }

    #[test]
    fn repo_path_env_must_be_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let result = repo_paths_from(dir.path(), &[], Some("relative/path".to_string()));
        assert!(result.is_err());
    }
}
