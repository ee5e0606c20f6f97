use std::path::Path;

use anyhow::Result;

use crate::styling::{INFO, INFO_EMOJI};
use crate::workspace::Workspace;

pub fn run(dir: &Path) -> Result<()> {
    let workspace = Workspace::create(dir)?;
    crate::styling::println!(
        "{INFO_EMOJI} {INFO}initialized workspace at {}{INFO:#}",
        workspace.root().display()
    );
    Ok(())
}
