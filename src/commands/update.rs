use anyhow::Result;

use crate::styling::{INFO, INFO_EMOJI};
use crate::workspace::Workspace;

pub fn run(mut workspace: Workspace) -> Result<()> {
    workspace.update()?;
    let count = workspace.lockfile().map(|l| l.entries().len()).unwrap_or(0);
    crate::styling::println!("{INFO_EMOJI} {INFO}resolved {count} package(s){INFO:#}");
    Ok(())
}
