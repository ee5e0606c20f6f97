//! Lockfile — the resolver's output: one entry per package in the
//! dependency graph, each pinned to a full commit hash.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::git::is_full_hash;
use crate::manifest::write_json_atomic;

/// A single resolved, pinned package. Unlike [`crate::manifest::Dependency`],
/// `commit` here is always a full 40-hex hash — never a branch, tag, or
/// short hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LockEntry {
    pub name: String,
    pub source: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The ordered set of [`LockEntry`] values produced by a resolve. Order
/// matches the order packages were selected in (see
/// [`crate::resolver::Resolver::resolve`]), not alphabetical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lockfile {
    entries: Vec<LockEntry>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LockEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LockEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn push(&mut self, entry: LockEntry) {
        self.entries.push(entry);
    }

    /// Parse JSON from `path`. If `safe` is true and the file is missing,
    /// return an empty Lockfile instead of erroring. Every `commit` field
    /// must be a full 40-hex hash or this fails outright.
    pub fn read(path: &Path, safe: bool) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if safe && e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::new());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let entries: Vec<LockEntry> = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        for entry in &entries {
            if !is_full_hash(&entry.commit) {
                bail!(
                    "{} names '{}' with a non-full commit hash '{}'",
                    path.display(),
                    entry.name,
                    entry.commit
                );
            }
        }
        Ok(Self { entries })
    }

    /// Atomically serialize as pretty JSON, preserving insertion order.
    pub fn write(&self, path: &Path) -> Result<()> {
        for entry in &self.entries {
            debug_assert!(
                is_full_hash(&entry.commit),
                "refusing to persist a non-full commit hash for '{}'",
                entry.name
            );
        }
        write_json_atomic(path, &self.entries)
    }
}
