use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::manifest::{Dependency, name_from_source};
use crate::styling::{INFO, INFO_EMOJI};
use crate::workspace::Workspace;

/// Default revision spec for a freshly added dependency, absent an explicit `--commit`.
const DEFAULT_COMMIT: &str = "master";

pub fn run(
    workspace: &Workspace,
    cwd: &Path,
    source: String,
    name: Option<String>,
    commit: Option<String>,
    package: Option<PathBuf>,
) -> Result<()> {
    let package_dir = match package {
        Some(dir) => dir,
        None => workspace.current_package_dir(cwd)?,
    };

    let name = name.unwrap_or_else(|| name_from_source(&source));
    let resolved_source = crate::source::resolve_source(&source, workspace.root())?;
    let dep = Dependency::new(&name, &resolved_source, commit.unwrap_or_else(|| DEFAULT_COMMIT.to_string()));
    workspace
        .add_dependency_to(&package_dir, dep)
        .with_context(|| format!("'{}' already depends on '{name}'", package_dir.display()))?;

    crate::styling::println!("{INFO_EMOJI} {INFO}added '{name}' to {}{INFO:#}", package_dir.display());
    Ok(())
}
