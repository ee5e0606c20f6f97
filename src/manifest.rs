//! Manifest — an ordered sequence of dependency declarations persisted as
//! JSON at `wit-manifest.json` (or, for the workspace root, `wit-workspace.json`).

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use indexmap::IndexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single declared dependency: a name, a source, and a revision spec.
///
/// In a [`Manifest`], `commit` is any rev-parse-able specifier (branch, tag,
/// full or short hash); in a [`crate::lockfile::Lockfile`] the equivalent
/// field is always a full 40-hex hash (see [`crate::lockfile::LockEntry`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Dependency {
    pub name: String,
    pub source: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, source: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            commit: commit.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// JSON shape accepted on read: `name` is optional (derived from `source`),
/// and unknown keys are silently ignored (serde's default behavior for a
/// struct without `deny_unknown_fields`).
#[derive(Debug, Deserialize)]
struct RawDependency {
    #[serde(default)]
    name: Option<String>,
    source: String,
    commit: String,
    #[serde(default)]
    message: Option<String>,
}

/// Derive a package name from the final path segment of a source URL, with
/// a trailing `.git` stripped.
///
/// ```
/// assert_eq!(wit::manifest::name_from_source("/a/b/c/def.git"), "def");
/// assert_eq!(wit::manifest::name_from_source("a.git"), "a");
/// assert_eq!(wit::manifest::name_from_source("ghi"), "ghi");
/// ```
pub fn name_from_source(source: &str) -> String {
    let trimmed = source.trim_end_matches(['/', '\\']);
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);
    base.strip_suffix(".git").unwrap_or(base).to_string()
}

/// An ordered sequence of [`Dependency`] declarations. Order is insertion
/// order and is preserved on every read/write — never re-sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    dependencies: Vec<Dependency>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn contains_dependency(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Fails if a dependency with the same name already exists.
    pub fn add_dependency(&mut self, dep: Dependency) -> Result<()> {
        if self.contains_dependency(&dep.name) {
            bail!("already depends on '{}'", dep.name);
        }
        self.dependencies.push(dep);
        Ok(())
    }

    /// Fails if no dependency with this name exists yet.
    pub fn replace_dependency(&mut self, dep: Dependency) -> Result<()> {
        match self.dependencies.iter_mut().find(|d| d.name == dep.name) {
            Some(slot) => {
                *slot = dep;
                Ok(())
            }
            None => bail!("does not depend on '{}'", dep.name),
        }
    }

    pub fn remove_dependency(&mut self, name: &str) -> Result<()> {
        let before = self.dependencies.len();
        self.dependencies.retain(|d| d.name != name);
        if self.dependencies.len() == before {
            bail!("does not depend on '{}'", name);
        }
        Ok(())
    }

    /// Construct a Manifest from an already-parsed JSON array. Missing names
    /// are derived from `source`; duplicate names are a fatal error.
    fn process_manifest(raw: Vec<RawDependency>) -> Result<Self> {
        let mut dependencies = Vec::with_capacity(raw.len());
        let mut seen = IndexSet::new();
        for entry in raw {
            let name = entry.name.unwrap_or_else(|| name_from_source(&entry.source));
            if !seen.insert(name.clone()) {
                bail!("duplicate dependency name '{name}' in manifest");
            }
            dependencies.push(Dependency {
                name,
                source: entry.source,
                commit: entry.commit,
                message: entry.message,
            });
        }
        Ok(Self { dependencies })
    }

    /// Parse JSON from `path`. If `safe` is true and the file is missing,
    /// return an empty Manifest instead of erroring.
    pub fn read(path: &Path, safe: bool) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if safe && e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::new());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let raw: Vec<RawDependency> = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Self::process_manifest(raw)
    }

    /// Atomically serialize as pretty JSON (4-space indent, stable key order:
    /// name, source, commit, message). Writes to a temp file in the same
    /// directory, then renames over the destination.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, &self.dependencies)
    }
}

/// Shared by [`Manifest::write`] and [`crate::lockfile::Lockfile::write`]:
/// serialize `value` as 4-space-indented JSON and rename it into place so a
/// reader never observes a half-written file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .with_context(|| format!("serializing {}", path.display()))?;
    buf.push(b'\n');

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(&buf)
        .with_context(|| format!("writing {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}
