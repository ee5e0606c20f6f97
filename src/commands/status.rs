use anyhow::Result;

use crate::styling::{ERROR, HINT, INFO};
use crate::workspace::{PackageStatus, Workspace};

pub fn run(workspace: Workspace) -> Result<()> {
    let report = workspace.status()?;
    if report.packages.is_empty() {
        crate::styling::println!("{HINT}no packages resolved yet; run `wit update`{HINT:#}");
        return Ok(());
    }
    for package in &report.packages {
        let label = describe(package);
        if package.is_clean() {
            crate::styling::println!("{INFO}{:<20} {label}{INFO:#}", package.name);
        } else if package.missing {
            crate::styling::println!("{ERROR}{:<20} {label}{ERROR:#}", package.name);
        } else if package.new_commits || package.modified {
            crate::styling::println!("{ERROR}{:<20} {label}{ERROR:#}", package.name);
        } else {
            crate::styling::println!("{HINT}{:<20} {label}{HINT:#}", package.name);
        }
    }
    for untracked in &report.untracked {
        crate::styling::println!("{HINT}{:<20} untracked package{HINT:#}", untracked.name);
    }
    if !report.is_clean() {
        anyhow::bail!("one or more packages are not clean");
    }
    Ok(())
}

/// Join every active condition into one label, e.g. `"new commits, dirty"`.
/// A package with none active is `"clean"`.
fn describe(package: &PackageStatus) -> String {
    if package.missing {
        return "missing".to_string();
    }
    let mut conditions = Vec::new();
    if package.new_commits {
        conditions.push("new commits");
    }
    if package.modified {
        conditions.push("dirty");
    }
    if package.untracked {
        conditions.push("untracked");
    }
    if conditions.is_empty() {
        "clean".to_string()
    } else {
        conditions.join(", ")
    }
}
