//! Resolver — the recency-wins dependency resolution algorithm.
//!
//! Starting from a root manifest, packages are visited in descending commit-
//! time order (a max priority queue keyed on commit time). The first time a
//! package name is popped it is selected at that commit; every later pop of
//! the same name must name a commit that is an ancestor of the one already
//! selected, or the resolve fails. A package's dependencies may never be
//! newer than the package itself, and two packages may never disagree about
//! a shared dependency's source.

use std::cmp::Ordering;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::lockfile::{LockEntry, Lockfile};
use crate::manifest::{Dependency, Manifest};
use crate::package::{PackageRepo, clone_dir};
use crate::source;
use crate::styling::{ERROR, ERROR_EMOJI};

/// Fatal resolution failures. All other I/O-ish failures (bad source,
/// missing commit, ...) surface as [`crate::git::GitError`] wrapped by
/// `anyhow::Context` instead.
#[derive(Debug)]
pub enum ResolveError {
    /// Two packages in the graph named the same dependency with different sources.
    SourceConflict {
        name: String,
        existing_source: String,
        new_source: String,
    },
    /// A dependency's commit is newer than the package that depends on it.
    DependentNewerThanParent { child: String, parent: String },
    /// A later, older selection attempt for `name` named a commit that is
    /// not an ancestor of the commit already selected for it.
    NotAncestor {
        name: String,
        commit: String,
        selected: String,
    },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::SourceConflict {
                name,
                existing_source,
                new_source,
            } => write!(
                f,
                "{ERROR_EMOJI} {ERROR}conflicting sources for '{name}': '{existing_source}' vs '{new_source}'{ERROR:#}"
            ),
            ResolveError::DependentNewerThanParent { child, parent } => write!(
                f,
                "{ERROR_EMOJI} {ERROR}'{parent}' depends on '{child}' at a commit newer than itself{ERROR:#}"
            ),
            ResolveError::NotAncestor {
                name,
                commit,
                selected,
            } => write!(
                f,
                "{ERROR_EMOJI} {ERROR}'{name}' was already selected at '{selected}', which '{commit}' is not an ancestor of{ERROR:#}"
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Resolver tuning knobs: where to clone/find package repos, and how many
/// sibling dependencies may be fetched concurrently.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Directory packages are cloned into, named by package: `<store>/<name>`.
    pub store: PathBuf,
    /// Workspace root, used to resolve relative manifest sources.
    pub workspace_root: PathBuf,
    /// Upper bound on concurrent clone/fetch operations for one package's
    /// dependency set. `1` (or fewer) disables the thread pool entirely.
    pub jobs: usize,
    /// Extra search directories (`--repo-path`), consulted ahead of
    /// `$WIT_REPO_PATH` and the workspace's own store (see
    /// [`crate::source::resolve_source_with_repo_paths`]).
    pub repo_paths: Vec<PathBuf>,
    /// When true (the default), a missing package is cloned. When false, a
    /// missing package is a fatal error instead — used by a dry-run resolve
    /// pass that reports drift without touching disk.
    pub download: bool,
}

impl ResolverConfig {
    pub fn new(workspace_root: impl Into<PathBuf>, store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
            workspace_root: workspace_root.into(),
            jobs: 1,
            repo_paths: Vec::new(),
            download: true,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_repo_paths(mut self, repo_paths: Vec<PathBuf>) -> Self {
        self.repo_paths = repo_paths;
        self
    }

    pub fn with_download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }
}

#[derive(Debug, Clone)]
struct QueueItem {
    commit_time: i64,
    commit: String,
    name: String,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.commit_time == other.commit_time && self.name == other.name
    }
}
impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueItem {
    /// Greatest commit time first; ties broken by name for determinism.
    fn cmp(&self, other: &Self) -> Ordering {
        self.commit_time
            .cmp(&other.commit_time)
            .then_with(|| self.name.cmp(&other.name))
    }
}

struct PrefetchedChild {
    dep: Dependency,
    resolved_source: String,
    repo: PackageRepo,
    commit: String,
    commit_time: i64,
}

/// Resolves a root [`Manifest`] into a [`Lockfile`] by the recency-wins
/// algorithm. See the module docs for the selection rule.
pub struct Resolver<'a> {
    config: &'a ResolverConfig,
    repos: IndexMap<String, PackageRepo>,
    sources: IndexMap<String, String>,
    messages: IndexMap<String, Option<String>>,
    selected: IndexMap<String, String>,
    order: Vec<String>,
    queue: std::collections::BinaryHeap<QueueItem>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a ResolverConfig) -> Self {
        Self {
            config,
            repos: IndexMap::new(),
            sources: IndexMap::new(),
            messages: IndexMap::new(),
            selected: IndexMap::new(),
            order: Vec::new(),
            queue: std::collections::BinaryHeap::new(),
        }
    }

    /// Run the resolver from `root_manifest` and emit the resulting lockfile.
    pub fn resolve(root_manifest: &Manifest, config: &'a ResolverConfig) -> Result<Lockfile> {
        let mut resolver = Self::new(config);
        resolver.seed(root_manifest)?;
        resolver.run()?;
        Ok(resolver.into_lockfile())
    }

    fn seed(&mut self, root_manifest: &Manifest) -> Result<()> {
        for dep in root_manifest.dependencies() {
            let resolved_source = source::resolve_source_with_repo_paths(
                &dep.name,
                &dep.source,
                &self.config.workspace_root,
                &self.config.repo_paths,
            )?;
            self.record_source(&dep.name, &resolved_source)?;
            self.messages.insert(dep.name.clone(), dep.message.clone());

            let repo = self.load_or_insert_repo(&dep.name, &resolved_source)?;
            if self.config.download {
                repo.fetch()?;
            }
            let commit = repo.resolve_revision(&dep.commit)?;
            let commit_time = repo.commit_time(&commit)?;
            self.queue.push(QueueItem {
                commit_time,
                commit,
                name: dep.name.clone(),
            });
        }
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        while let Some(item) = self.queue.pop() {
            self.process(item)?;
        }
        Ok(())
    }

    fn process(&mut self, item: QueueItem) -> Result<()> {
        if let Some(existing) = self.selected.get(&item.name).cloned() {
            if existing == item.commit {
                return Ok(());
            }
            let repo = self.repos.get(&item.name).expect("selected implies repo exists");
            if repo.is_ancestor(&item.commit, &existing)? {
                return Ok(());
            }
            return Err(ResolveError::NotAncestor {
                name: item.name,
                commit: item.commit,
                selected: existing,
            }
            .into());
        }

        self.selected.insert(item.name.clone(), item.commit.clone());
        self.order.push(item.name.clone());

        let repo = self.repos.get(&item.name).expect("seeded or prefetched earlier");
        let child_manifest = repo
            .read_manifest_at(&item.commit)
            .with_context(|| format!("reading manifest for '{}' at '{}'", item.name, item.commit))?;
        let deps: Vec<Dependency> = child_manifest.dependencies().to_vec();
        if deps.is_empty() {
            return Ok(());
        }

        let prefetched = self.prefetch_children(&deps)?;
        for child in prefetched {
            self.record_source(&child.dep.name, &child.resolved_source)?;
            self.messages
                .entry(child.dep.name.clone())
                .or_insert_with(|| child.dep.message.clone());
            self.repos.entry(child.dep.name.clone()).or_insert(child.repo);

            if child.commit_time > item.commit_time {
                return Err(ResolveError::DependentNewerThanParent {
                    child: child.dep.name.clone(),
                    parent: item.name.clone(),
                }
                .into());
            }

            self.queue.push(QueueItem {
                commit_time: child.commit_time,
                commit: child.commit,
                name: child.dep.name,
            });
        }
        Ok(())
    }

    /// Clone/fetch/resolve a package's dependencies concurrently (bounded by
    /// `config.jobs`). Only I/O against each child's own, freshly created
    /// clone happens in parallel; every mutation of shared resolver state
    /// happens afterward, sequentially, in [`Resolver::process`].
    fn prefetch_children(&self, deps: &[Dependency]) -> Result<Vec<PrefetchedChild>> {
        let prefetch_one = |dep: &Dependency| -> Result<PrefetchedChild> {
            let resolved_source = source::resolve_source_with_repo_paths(
                &dep.name,
                &dep.source,
                &self.config.workspace_root,
                &self.config.repo_paths,
            )?;
            let dest = clone_dir(&self.config.store, &dep.name);
            let repo = PackageRepo::ensure_cloned(&dep.name, &resolved_source, &dest, self.config.download)?;
            if self.config.download {
                repo.fetch()?;
            }
            let commit = repo.resolve_revision(&dep.commit)?;
            let commit_time = repo.commit_time(&commit)?;
            Ok(PrefetchedChild {
                dep: dep.clone(),
                resolved_source,
                repo,
                commit,
                commit_time,
            })
        };

        if deps.len() > 1 && self.config.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()
                .context("building resolver thread pool")?;
            pool.install(|| deps.par_iter().map(prefetch_one).collect())
        } else {
            deps.iter().map(prefetch_one).collect()
        }
    }

    fn load_or_insert_repo(&mut self, name: &str, source: &str) -> Result<&PackageRepo> {
        if !self.repos.contains_key(name) {
            let dest = clone_dir(&self.config.store, name);
            let repo = PackageRepo::ensure_cloned(name, source, &dest, self.config.download)?;
            self.repos.insert(name.to_string(), repo);
        }
        Ok(self.repos.get(name).expect("just inserted"))
    }

    fn record_source(&mut self, name: &str, source: &str) -> Result<()> {
        if let Some(existing) = self.sources.get(name) {
            if existing != source {
                return Err(ResolveError::SourceConflict {
                    name: name.to_string(),
                    existing_source: existing.clone(),
                    new_source: source.to_string(),
                }
                .into());
            }
            return Ok(());
        }
        self.sources.insert(name.to_string(), source.to_string());
        Ok(())
    }

    fn into_lockfile(self) -> Lockfile {
        let mut lockfile = Lockfile::new();
        for name in &self.order {
            let commit = self.selected.get(name).expect("order entries are selected").clone();
            let source = self.sources.get(name).expect("source recorded when selected").clone();
            let message = self.messages.get(name).cloned().flatten();
            lockfile.push(LockEntry {
                name: name.clone(),
                source,
                commit,
                message,
            });
        }
        lockfile
    }
}

/// Entry point used by [`crate::workspace::Workspace`]: resolve `manifest`
/// against `config`, cloning/fetching packages into `config.store` as needed.
pub fn resolve(manifest: &Manifest, config: &ResolverConfig) -> Result<Lockfile> {
    Resolver::resolve(manifest, config)
}
