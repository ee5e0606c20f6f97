//! Workspace — binds a root directory, its root manifest, an optional
//! lockfile, and the resolved `repo_paths`/`jobs` configuration together.
//!
//! Distinguishes discovering a workspace from an arbitrary path
//! ([`Workspace::find`]) from loading one whose root is already known
//! ([`Workspace::at`]).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::lockfile::Lockfile;
use crate::manifest::{Dependency, Manifest};
use crate::package::{PackageRepo, clone_dir};
use crate::resolver::{self, ResolverConfig};
use crate::styling::{ERROR, ERROR_EMOJI};

/// Root manifest filename, distinct from a package's own `wit-manifest.json`.
pub const MANIFEST: &str = "wit-workspace.json";
/// Root lockfile filename.
pub const LOCK: &str = "wit-lock.json";
/// Scratch directory consulted by the source-lookup policy for pre-existing
/// clones (see [`crate::source::repo_paths`]) — NOT where resolved packages
/// live. The workspace is a *flat* directory of clones: every
/// selected package gets its own subdirectory directly under the workspace
/// root, named after the package.
pub const STORE_DIR: &str = ".wit";

#[derive(Debug)]
pub enum WorkspaceError {
    /// No `wit-workspace.json` was found walking up from the given path.
    NotFound { start: PathBuf },
    /// A path expected to be a package's own clone isn't one.
    NotAPackage { path: PathBuf },
}

/// A directory under the workspace's store that is a git clone but is not
/// named by any entry in the lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntrackedPackage {
    pub name: String,
}

impl std::fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceError::NotFound { start } => write!(
                f,
                "{ERROR_EMOJI} {ERROR}no {MANIFEST} found above '{}'{ERROR:#}",
                start.display()
            ),
            WorkspaceError::NotAPackage { path } => write!(
                f,
                "{ERROR_EMOJI} {ERROR}'{}' is not a package{ERROR:#}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for WorkspaceError {}

/// One package's condition, as reported by [`Workspace::status`]. These are
/// independent flags, not a single state: a package can simultaneously have
/// new upstream commits, local modifications, and untracked files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageStatus {
    pub name: String,
    /// Listed in the lockfile but never cloned. When true, the other flags
    /// are meaningless (there's no working tree to inspect).
    pub missing: bool,
    /// The lockfile's recorded commit differs from the clone's current HEAD.
    pub new_commits: bool,
    /// `git status --porcelain` reports changes to tracked files.
    pub modified: bool,
    /// `git status --porcelain` reports untracked files.
    pub untracked: bool,
}

impl PackageStatus {
    pub fn is_clean(&self) -> bool {
        !self.missing && !self.new_commits && !self.modified && !self.untracked
    }
}

/// Report produced by [`Workspace::status`]: read-only, consumed by the
/// `status` command — never mutates workspace state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceStatus {
    pub packages: Vec<PackageStatus>,
    /// Store directories that are git clones but unnamed in the lockfile.
    pub untracked: Vec<UntrackedPackage>,
}

impl WorkspaceStatus {
    pub fn is_clean(&self) -> bool {
        self.packages.iter().all(PackageStatus::is_clean) && self.untracked.is_empty()
    }
}

/// A workspace root: a directory holding `wit-workspace.json` and, after at
/// least one successful `update`, `wit-lock.json`.
pub struct Workspace {
    root: PathBuf,
    manifest: Manifest,
    lockfile: Option<Lockfile>,
    jobs: usize,
    repo_paths: Vec<PathBuf>,
}

impl Workspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn lockfile(&self) -> Option<&Lockfile> {
        self.lockfile.as_ref()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST)
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCK)
    }

    /// Where resolved packages live: the workspace root itself — a flat
    /// directory of clones, one subdirectory per selected package.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.clone()
    }

    /// The `.wit` scratch directory: not where packages are checked out,
    /// only a search location the source-lookup policy consults for
    /// pre-existing clones (see [`crate::source::repo_paths`]).
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(STORE_DIR)
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_repo_paths(mut self, repo_paths: Vec<PathBuf>) -> Self {
        self.repo_paths = repo_paths;
        self
    }

    /// Create a new, empty workspace at `root` (creating the directory if
    /// needed) and write an empty `wit-workspace.json`.
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))?;
        let manifest = Manifest::new();
        let workspace = Self {
            root: root.to_path_buf(),
            manifest,
            lockfile: None,
            jobs: 1,
            repo_paths: Vec::new(),
        };
        workspace.manifest.write(&workspace.manifest_path())?;
        fs::create_dir_all(workspace.scratch_dir())
            .with_context(|| format!("creating {}", workspace.scratch_dir().display()))?;
        Ok(workspace)
    }

    /// Walk upward from `start` (inclusive) until a directory containing
    /// `wit-workspace.json` is found.
    pub fn find(start: &Path) -> Result<Self> {
        let mut dir = dunce::canonicalize(start)
            .with_context(|| format!("resolving {}", start.display()))?;
        loop {
            if dir.join(MANIFEST).is_file() {
                return Self::at(&dir);
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => {
                    return Err(WorkspaceError::NotFound {
                        start: start.to_path_buf(),
                    }
                    .into());
                }
            }
        }
    }

    /// Load the workspace rooted exactly at `root` (no upward search).
    pub fn at(root: &Path) -> Result<Self> {
        let manifest = Manifest::read(&root.join(MANIFEST), false)?;
        let lockfile_path = root.join(LOCK);
        let lockfile = if lockfile_path.is_file() {
            Some(Lockfile::read(&lockfile_path, false)?)
        } else {
            None
        };
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            lockfile,
            jobs: 1,
            repo_paths: Vec::new(),
        })
    }

    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new(self.root.clone(), self.packages_dir())
            .with_jobs(self.jobs)
            .with_repo_paths(self.repo_paths.clone())
    }

    /// Resolve the root manifest into a lockfile, cloning/fetching packages
    /// into the workspace's store as needed. Does not write anything to disk
    /// and does not check out any package — see [`Workspace::update`].
    pub fn resolve(&self) -> Result<Lockfile> {
        resolver::resolve(&self.manifest, &self.resolver_config())
    }

    /// Same as [`Workspace::resolve`], but requires every package to already
    /// be present instead of cloning a missing one — surfaces resolution
    /// drift (manifest changes, moved commits) without touching disk. Used
    /// by `status` to report on resolvability without mutating the store.
    pub fn resolve_without_downloading(&self) -> Result<Lockfile> {
        resolver::resolve(&self.manifest, &self.resolver_config().with_download(false))
    }

    /// Full update: resolve, check out every selected commit, and persist
    /// the resulting lockfile.
    pub fn update(&mut self) -> Result<()> {
        let lockfile = self.resolve()?;
        self.checkout(&lockfile)?;
        lockfile.write(&self.lockfile_path())?;
        self.lockfile = Some(lockfile);
        Ok(())
    }

    /// Check out every package named in `lockfile` at its selected commit,
    /// without re-resolving. Used by `update` (after a fresh resolve) and by
    /// the `restore` command (re-checkout from an existing lockfile).
    pub fn checkout(&self, lockfile: &Lockfile) -> Result<()> {
        for entry in lockfile.entries() {
            let dest = clone_dir(&self.packages_dir(), &entry.name);
            let repo = PackageRepo::ensure_cloned(&entry.name, &entry.source, &dest, true)?;
            repo.checkout(&entry.commit)
                .with_context(|| format!("checking out '{}'", entry.name))?;
        }
        Ok(())
    }

    /// Re-checkout from the on-disk `wit-lock.json` without resolving again.
    pub fn restore(&self) -> Result<()> {
        let lockfile = Lockfile::read(&self.lockfile_path(), false)
            .with_context(|| format!("reading {}", self.lockfile_path().display()))?;
        self.checkout(&lockfile)
    }

    /// Condition of every package named in the lockfile (or, absent a
    /// lockfile, the empty report). Re-resolves the manifest without
    /// downloading first: a package absent from disk is reported below as
    /// `missing`, same as always, but a genuine resolution conflict (two
    /// parents disagreeing on a source, a dependent newer than its parent,
    /// a non-ancestor commit) is surfaced here as an error instead of being
    /// silently ignored until the next `update`.
    pub fn status(&self) -> Result<WorkspaceStatus> {
        let Some(lockfile) = &self.lockfile else {
            return Ok(WorkspaceStatus::default());
        };
        if let Err(e) = self.resolve_without_downloading() {
            if e.downcast_ref::<resolver::ResolveError>().is_some() {
                return Err(e).context("resolving manifest against the existing lockfile");
            }
        }
        let mut packages = Vec::with_capacity(lockfile.entries().len());
        for entry in lockfile.entries() {
            let dest = clone_dir(&self.packages_dir(), &entry.name);
            if !dest.join(".git").exists() {
                packages.push(PackageStatus {
                    name: entry.name.clone(),
                    missing: true,
                    ..Default::default()
                });
                continue;
            }
            let repo = PackageRepo::at(&entry.name, &entry.source, &dest);
            let new_commits = repo.head_commit()? != entry.commit;
            let porcelain = repo.status_porcelain()?;
            let modified = porcelain.lines().any(|l| !l.starts_with("??"));
            let untracked = porcelain.lines().any(|l| l.starts_with("??"));
            packages.push(PackageStatus {
                name: entry.name.clone(),
                missing: false,
                new_commits,
                modified,
                untracked,
            });
        }

        let mut untracked = Vec::new();
        if let Ok(read_dir) = fs::read_dir(self.packages_dir()) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                if name == STORE_DIR || !path.is_dir() || !path.join(".git").exists() {
                    continue;
                }
                if lockfile.get(&name).is_none() {
                    untracked.push(UntrackedPackage { name });
                }
            }
        }
        untracked.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(WorkspaceStatus { packages, untracked })
    }

    /// Add a new dependency to the manifest at `package_dir` (the workspace
    /// root for the root manifest, or a package's own clone for a nested
    /// one), failing if that name is already declared there.
    pub fn add_dependency_to(&self, package_dir: &Path, dep: Dependency) -> Result<()> {
        let path = self.manifest_path_for(package_dir);
        edit_manifest(&path, |manifest| manifest.add_dependency(dep))
    }

    /// Replace an existing dependency's source/commit in the manifest at
    /// `package_dir`, failing if it isn't already declared there.
    pub fn replace_dependency_in(&self, package_dir: &Path, dep: Dependency) -> Result<()> {
        let path = self.manifest_path_for(package_dir);
        edit_manifest(&path, |manifest| manifest.replace_dependency(dep))
    }

    /// The manifest file that governs `package_dir`: `wit-workspace.json`
    /// for the workspace root itself, `wit-manifest.json` for any other
    /// package's own clone.
    fn manifest_path_for(&self, package_dir: &Path) -> PathBuf {
        if package_dir == self.root {
            self.manifest_path()
        } else {
            package_dir.join(crate::package::MANIFEST_FILE)
        }
    }

    /// Determine which package's manifest `add-dep`/`update-dep` should edit
    /// when no `--package` flag was given: the clone of a package directly
    /// under the workspace root that `cwd` lies within. The workspace root
    /// itself is never a valid target — a dependency is always added to a
    /// specific package, never to the root manifest this way.
    pub fn current_package_dir(&self, cwd: &Path) -> Result<PathBuf> {
        let cwd = dunce::canonicalize(cwd).with_context(|| format!("resolving {}", cwd.display()))?;
        let root = dunce::canonicalize(&self.root).with_context(|| format!("resolving {}", self.root.display()))?;
        if cwd == root {
            return Err(WorkspaceError::NotAPackage { path: cwd }.into());
        }
        if let Ok(rel) = cwd.strip_prefix(&root) {
            if let Some(name) = rel.components().next() {
                let name = name.as_os_str().to_string_lossy();
                let known = match &self.lockfile {
                    Some(lockfile) => lockfile.get(&name).is_some(),
                    None => self.packages_dir().join(name.as_ref()).join(".git").exists(),
                };
                if known {
                    return Ok(self.packages_dir().join(name.as_ref()));
                }
            }
        }
        Err(WorkspaceError::NotAPackage { path: cwd }.into())
    }
}

fn edit_manifest(path: &Path, f: impl FnOnce(&mut Manifest) -> Result<()>) -> Result<()> {
    let mut manifest = Manifest::read(path, true)?;
    f(&mut manifest)?;
    manifest.write(path)
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

    fn init_repo_with_commit(dir: &Path) -> String {
        fs::create_dir_all(dir).unwrap();
        run_git(dir, &["init", "-q"]);
        run_git(dir, &["config", "user.email", "test@example.com"]);
        run_git(dir, &["config", "user.name", "Test"]);
        fs::write(dir.join("README"), "hi").unwrap();
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
    fn create_then_find_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        Workspace::create(&root).unwrap();

        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let found = Workspace::find(&nested).unwrap();
        assert_eq!(found.root(), root.as_path());
        assert!(found.manifest().dependencies().is_empty());
    }

    #[test]
    fn find_fails_outside_any_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Workspace::find(tmp.path()).is_err());
    }

    #[test]
    fn update_writes_lockfile_and_checks_out_packages() {
        let tmp = tempfile::tempdir().unwrap();
        let leaf = tmp.path().join("leaf");
        let head = init_repo_with_commit(&leaf);

        let root = tmp.path().join("ws");
        let mut workspace = Workspace::create(&root).unwrap();
        workspace
            .add_dependency_to(&root, Dependency::new("leaf", leaf.to_str().unwrap(), "master"))
            .unwrap();
        workspace.manifest = Manifest::read(&workspace.manifest_path(), false).unwrap();

        workspace.update().unwrap();

        assert!(workspace.lockfile_path().is_file());
        let lockfile = workspace.lockfile().unwrap();
        assert_eq!(lockfile.entries()[0].commit, head);

        let status = workspace.status().unwrap();
        assert!(status.is_clean());
    }

    #[test]
    fn status_reports_missing_package_without_a_clone() {
        let tmp = tempfile::tempdir().unwrap();
        let leaf = tmp.path().join("leaf");
        init_repo_with_commit(&leaf);

        let root = tmp.path().join("ws");
        let mut workspace = Workspace::create(&root).unwrap();
        workspace
            .add_dependency_to(&root, Dependency::new("leaf", leaf.to_str().unwrap(), "master"))
            .unwrap();
        workspace.manifest = Manifest::read(&workspace.manifest_path(), false).unwrap();
        workspace.update().unwrap();

        fs::remove_dir_all(workspace.packages_dir().join("leaf")).unwrap();
        let status = workspace.status().unwrap();
        assert!(status.packages[0].missing);
    }

    #[test]
    fn status_reports_new_commits_ahead_of_the_lockfile() {
        let tmp = tempfile::tempdir().unwrap();
        let leaf = tmp.path().join("leaf");
        init_repo_with_commit(&leaf);

        let root = tmp.path().join("ws");
        let mut workspace = Workspace::create(&root).unwrap();
        workspace
            .add_dependency_to(&root, Dependency::new("leaf", leaf.to_str().unwrap(), "master"))
            .unwrap();
        workspace.manifest = Manifest::read(&workspace.manifest_path(), false).unwrap();
        workspace.update().unwrap();

        let clone_dir = workspace.packages_dir().join("leaf");
        fs::write(clone_dir.join("README"), "updated").unwrap();
        run_git(&clone_dir, &["add", "-A"]);
        run_git(&clone_dir, &["commit", "-q", "-m", "second"]);

        let status = workspace.status().unwrap();
        assert!(status.packages[0].new_commits);
        assert!(!status.packages[0].missing);
        assert!(!status.is_clean());
    }

    #[test]
    fn status_surfaces_resolution_conflicts_in_the_current_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let leaf = tmp.path().join("leaf");
        init_repo_with_commit(&leaf);

        let root = tmp.path().join("ws");
        let mut workspace = Workspace::create(&root).unwrap();
        workspace
            .add_dependency_to(&root, Dependency::new("leaf", leaf.to_str().unwrap(), "master"))
            .unwrap();
        workspace.manifest = Manifest::read(&workspace.manifest_path(), false).unwrap();
        workspace.update().unwrap();

        let one = tmp.path().join("one");
        init_repo_with_commit(&one);
        let two = tmp.path().join("two");
        init_repo_with_commit(&two);

        let parent_a = tmp.path().join("parent-a");
        fs::create_dir_all(&parent_a).unwrap();
        run_git(&parent_a, &["init", "-q"]);
        run_git(&parent_a, &["config", "user.email", "test@example.com"]);
        run_git(&parent_a, &["config", "user.name", "Test"]);
        fs::write(
            parent_a.join("wit-manifest.json"),
            serde_json::to_string(&serde_json::json!([
                {"name": "shared", "source": one.to_str().unwrap(), "commit": "master"}
            ]))
            .unwrap(),
        )
        .unwrap();
        run_git(&parent_a, &["add", "-A"]);
        run_git(&parent_a, &["commit", "-q", "-m", "parent-a"]);

        let parent_b = tmp.path().join("parent-b");
        fs::create_dir_all(&parent_b).unwrap();
        run_git(&parent_b, &["init", "-q"]);
        run_git(&parent_b, &["config", "user.email", "test@example.com"]);
        run_git(&parent_b, &["config", "user.name", "Test"]);
        fs::write(
            parent_b.join("wit-manifest.json"),
            serde_json::to_string(&serde_json::json!([
                {"name": "shared", "source": two.to_str().unwrap(), "commit": "master"}
            ]))
            .unwrap(),
        )
        .unwrap();
        run_git(&parent_b, &["add", "-A"]);
        run_git(&parent_b, &["commit", "-q", "-m", "parent-b"]);

        workspace
            .manifest
            .add_dependency(Dependency::new("parent-a", parent_a.to_str().unwrap(), "master"))
            .unwrap();
        workspace
            .manifest
            .add_dependency(Dependency::new("parent-b", parent_b.to_str().unwrap(), "master"))
            .unwrap();

        let result = workspace.status();
        assert!(result.is_err());
    }

    #[test]
    fn resolved_packages_live_directly_under_workspace_root() {
        let tmp = tempfile::tempdir().unwrap();
        let leaf = tmp.path().join("leaf");
        init_repo_with_commit(&leaf);

        let root = tmp.path().join("ws");
        let mut workspace = Workspace::create(&root).unwrap();
        workspace
            .add_dependency_to(&root, Dependency::new("leaf", leaf.to_str().unwrap(), "master"))
            .unwrap();
        workspace.manifest = Manifest::read(&workspace.manifest_path(), false).unwrap();
        workspace.update().unwrap();

        assert!(root.join("leaf").join(".git").exists());
        assert!(!root.join(STORE_DIR).join("leaf").exists());
    }

    #[test]
    fn current_package_dir_rejects_workspace_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        let workspace = Workspace::create(&root).unwrap();
        assert!(workspace.current_package_dir(&root).is_err());
    }

    #[test]
    fn current_package_dir_resolves_known_package() {
        let tmp = tempfile::tempdir().unwrap();
        let leaf = tmp.path().join("leaf");
        init_repo_with_commit(&leaf);

        let root = tmp.path().join("ws");
        let mut workspace = Workspace::create(&root).unwrap();
        workspace
            .add_dependency_to(&root, Dependency::new("leaf", leaf.to_str().unwrap(), "master"))
            .unwrap();
        workspace.manifest = Manifest::read(&workspace.manifest_path(), false).unwrap();
        workspace.update().unwrap();

        let found = workspace.current_package_dir(&root.join("leaf")).unwrap();
        assert_eq!(found, root.join("leaf"));
    }
}
