use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::manifest::Manifest;
use crate::styling::{INFO, INFO_EMOJI};
use crate::workspace::Workspace;

pub fn run(
    workspace: &Workspace,
    cwd: &Path,
    name: String,
    commit: Option<String>,
    source: Option<String>,
    package: Option<PathBuf>,
) -> Result<()> {
    let package_dir = match package {
        Some(dir) => dir,
        None => workspace.current_package_dir(cwd)?,
    };

    let manifest_path = if package_dir == workspace.root() {
        workspace.manifest_path()
    } else {
        package_dir.join(crate::package::MANIFEST_FILE)
    };
    let existing = Manifest::read(&manifest_path, true)?
        .get(&name)
        .cloned()
        .with_context(|| format!("'{}' does not depend on '{name}'", package_dir.display()))?;

    let resolved_source = match source {
        Some(source) => crate::source::resolve_source(&source, workspace.root())?,
        None => existing.source,
    };
    let dep = crate::manifest::Dependency {
        name: name.clone(),
        source: resolved_source,
        commit: commit.unwrap_or(existing.commit),
        message: existing.message,
    };
    workspace.replace_dependency_in(&package_dir, dep)?;

    crate::styling::println!("{INFO_EMOJI} {INFO}updated '{name}' in {}{INFO:#}", package_dir.display());
    Ok(())
}
