//! PackageRepo — one on-disk clone of one dependency, created lazily and at
//! most once per package name (see [`crate::resolver::Resolver`]).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::git::GitBackend;
use crate::manifest::Manifest;

/// Name of the manifest file read out of a dependency's own repository
/// (distinct from the workspace root's `wit-workspace.json`).
pub const MANIFEST_FILE: &str = "wit-manifest.json";

/// A single package's clone: a name, the source it was cloned from, and the
/// [`GitBackend`] bound to its working directory.
#[derive(Debug, Clone)]
pub struct PackageRepo {
    name: String,
    source: String,
    git: GitBackend,
}

impl PackageRepo {
    /// Clone `source` to `dest` (skipping the clone if `dest` already looks
    /// like a git repository) and bind a [`PackageRepo`] to it. If
    /// `download` is false and `dest` isn't already a clone, fails instead of
    /// cloning — used by a no-download resolve pass that reports drift
    /// without touching disk.
    pub fn ensure_cloned(name: &str, source: &str, dest: &Path, download: bool) -> Result<Self> {
        if !dest.join(".git").exists() {
            if !download {
                anyhow::bail!("'{name}' is not present at '{}' and downloading is disabled", dest.display());
            }
            GitBackend::clone(source, dest)
                .with_context(|| format!("cloning '{name}' from '{source}'"))?;
        }
        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            git: GitBackend::new(dest.to_path_buf()),
        })
    }

    /// Bind a [`PackageRepo`] to an already-existing clone directory.
    pub fn at(name: &str, source: &str, dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            git: GitBackend::new(dir.to_path_buf()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &Path {
        self.git.path()
    }

    pub fn git(&self) -> &GitBackend {
        &self.git
    }

    pub fn fetch(&self) -> Result<()> {
        self.git
            .fetch(&self.source)
            .with_context(|| format!("fetching '{}' from '{}'", self.name, self.source))
    }

    /// Resolve `revision` (a branch, tag, full or short hash) to a full
    /// commit hash, confirming the result actually exists via `has_commit`
    /// (a short-hash `rev-parse` can report success on content that never
    /// made it into this clone).
    pub fn resolve_revision(&self, revision: &str) -> Result<String> {
        let hash = self
            .git
            .rev_parse(revision)
            .with_context(|| format!("resolving '{revision}' in '{}'", self.name))?;
        if !self.git.has_commit(&hash)? {
            anyhow::bail!(
                "'{}' resolved '{revision}' to '{hash}', which is not present in the clone",
                self.name
            );
        }
        Ok(hash)
    }

    pub fn commit_time(&self, hash: &str) -> Result<i64> {
        self.git
            .commit_time(hash)
            .with_context(|| format!("reading commit time for '{}' in '{}'", hash, self.name))
    }

    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        self.git
            .is_ancestor(ancestor, descendant)
            .with_context(|| format!("checking ancestry in '{}'", self.name))
    }

    /// Read and parse `wit-manifest.json` as it existed at `revision`. A
    /// leaf package with no manifest file yields an empty [`Manifest`].
    pub fn read_manifest_at(&self, revision: &str) -> Result<Manifest> {
        let bytes = self
            .git
            .show_blob(revision, MANIFEST_FILE)
            .with_context(|| format!("reading {MANIFEST_FILE} at {revision} in '{}'", self.name))?;
        if bytes.is_empty() {
            return Ok(Manifest::new());
        }
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{MANIFEST_FILE} at {revision} in '{}' is not UTF-8", self.name))?;
        let raw: Vec<crate::manifest::Dependency> = serde_json::from_str(&text)
            .with_context(|| format!("parsing {MANIFEST_FILE} at {revision} in '{}'", self.name))?;
        let mut manifest = Manifest::new();
        for dep in raw {
            manifest.add_dependency(dep)?;
        }
        Ok(manifest)
    }

    pub fn checkout(&self, revision: &str) -> Result<()> {
        self.git
            .checkout(revision)
            .with_context(|| format!("checking out '{revision}' in '{}'", self.name))
    }

    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.git.status_porcelain()?.is_empty())
    }

    pub fn status_porcelain(&self) -> Result<String> {
        Ok(self.git.status_porcelain()?)
    }

    pub fn head_commit(&self) -> Result<String> {
        Ok(self.git.head_commit()?)
    }
}

/// Derive the on-disk clone directory for a package: `<store>/<name>`.
pub fn clone_dir(store: &Path, name: &str) -> PathBuf {
    store.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn run_git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .expect("git must be installed to run this test");
        assert!(status.success(), "git {args:?} failed in {dir:?}");
    }

    fn init_repo_with_commit(dir: &Path, manifest: Option<&str>) -> String {
        std::fs::create_dir_all(dir).unwrap();
        run_git(dir, &["init", "-q"]);
        run_git(dir, &["config", "user.email", "test@example.com"]);
        run_git(dir, &["config", "user.name", "Test"]);
        if let Some(contents) = manifest {
            std::fs::write(dir.join(MANIFEST_FILE), contents).unwrap();
        } else {
            std::fs::write(dir.join("README"), "hello").unwrap();
        }
        run_git(dir, &["add", "-A"]);
        run_git(dir, &["commit", "-q", "-m", "initial"]);
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(dir)
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    #[test]
    fn ensure_cloned_then_resolve_and_read_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let origin = tmp.path().join("origin");
        let head = init_repo_with_commit(
            &origin,
            Some(r#"[{"name": "child", "source": "../child.git", "commit": "master"}]"#),
        );

        let dest = tmp.path().join("clone");
        let pkg = PackageRepo::ensure_cloned("leaf", origin.to_str().unwrap(), &dest, true).unwrap();

        let resolved = pkg.resolve_revision(&head).unwrap();
        assert_eq!(resolved, head);

        let manifest = pkg.read_manifest_at(&head).unwrap();
        assert_eq!(manifest.dependencies().len(), 1);
        assert_eq!(manifest.dependencies()[0].name, "child");
    }

    #[test]
    fn read_manifest_at_is_empty_for_leaf_package() {
        let tmp = tempfile::tempdir().unwrap();
        let origin = tmp.path().join("origin");
        let head = init_repo_with_commit(&origin, None);

        let dest = tmp.path().join("clone");
        let pkg = PackageRepo::ensure_cloned("leaf", origin.to_str().unwrap(), &dest, true).unwrap();
        let manifest = pkg.read_manifest_at(&head).unwrap();
        assert!(manifest.dependencies().is_empty());
    }

    #[test]
    fn ensure_cloned_requires_presence_when_download_is_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let origin = tmp.path().join("origin");
        init_repo_with_commit(&origin, None);

        let dest = tmp.path().join("clone");
        assert!(PackageRepo::ensure_cloned("leaf", origin.to_str().unwrap(), &dest, false).is_err());

        PackageRepo::ensure_cloned("leaf", origin.to_str().unwrap(), &dest, true).unwrap();
        assert!(PackageRepo::ensure_cloned("leaf", origin.to_str().unwrap(), &dest, false).is_ok());
    }
}
