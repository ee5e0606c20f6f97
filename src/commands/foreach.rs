//! `wit foreach` — run an arbitrary command in every resolved package's
//! working directory, sequentially, streaming output as it runs.

use std::process::Command as Process;

use anyhow::{Result, bail};

use crate::styling::{ERROR, ERROR_EMOJI, HINT, INFO};
use crate::workspace::Workspace;

pub fn run(workspace: &Workspace, command: &[String]) -> Result<()> {
    let Some(lockfile) = workspace.lockfile() else {
        crate::styling::println!("{HINT}no packages resolved yet; run `wit update`{HINT:#}");
        return Ok(());
    };

    let (program, args) = command.split_first().expect("clap requires at least one token");
    let mut failed = Vec::new();

    for entry in lockfile.entries() {
        let dir = workspace.packages_dir().join(&entry.name);
        if !dir.join(".git").exists() {
            crate::styling::println!("{HINT}skipping '{}': not cloned{HINT:#}", entry.name);
            continue;
        }

        crate::styling::println!("{INFO}==> {}{INFO:#}", entry.name);
        let status = Process::new(program)
            .args(args)
            .current_dir(&dir)
            .status();

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                crate::styling::eprintln!(
                    "{ERROR_EMOJI} {ERROR}'{}' exited with {status}{ERROR:#}",
                    entry.name
                );
                failed.push(entry.name.clone());
            }
            Err(e) => {
                crate::styling::eprintln!(
                    "{ERROR_EMOJI} {ERROR}failed to run in '{}': {e}{ERROR:#}",
                    entry.name
                );
                failed.push(entry.name.clone());
            }
        }
    }

    if !failed.is_empty() {
        bail!("command failed in: {}", failed.join(", "));
    }
    Ok(())
}
