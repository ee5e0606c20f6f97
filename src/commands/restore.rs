use anyhow::Result;

use crate::styling::{INFO, INFO_EMOJI};
use crate::workspace::Workspace;

pub fn run(workspace: Workspace) -> Result<()> {
    workspace.restore()?;
    crate::styling::println!("{INFO_EMOJI} {INFO}restored packages from {}{INFO:#}", workspace.lockfile_path().display());
    Ok(())
}
