//! `wit` binary entry point: parse arguments, dispatch to a subcommand,
//! print a formatted error and exit non-zero on failure.

use std::process::ExitCode;

use clap::Parser;

use wit::cli::{Cli, Command};
use wit::styling::{ERROR, ERROR_EMOJI};
use wit::workspace::Workspace;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(match cli.verbose {
            0 => "off",
            1 => "debug",
            _ => "trace",
        }),
    )
    .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            wit::styling::eprintln!("{ERROR_EMOJI} {ERROR}{e:#}{ERROR:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = match &cli.chdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    match cli.command {
        Command::Init { dir } => {
            let target = dir.map(|d| cwd.join(d)).unwrap_or_else(|| cwd.clone());
            wit::commands::init(&target)
        }
        Command::Update => {
            wit::git::require_git_installed()?;
            let workspace = load_workspace(&cli.repo_path, cli.jobs, &cwd)?;
            wit::commands::update(workspace)
        }
        Command::Status => {
            wit::git::require_git_installed()?;
            let workspace = load_workspace(&cli.repo_path, cli.jobs, &cwd)?;
            wit::commands::status(workspace)
        }
        Command::Restore => {
            wit::git::require_git_installed()?;
            let workspace = load_workspace(&cli.repo_path, cli.jobs, &cwd)?;
            wit::commands::restore(workspace)
        }
        Command::Foreach { command } => {
            wit::git::require_git_installed()?;
            let workspace = load_workspace(&cli.repo_path, cli.jobs, &cwd)?;
            wit::commands::foreach(&workspace, &command)
        }
        Command::AddDep { source, commit, name, package } => {
            wit::git::require_git_installed()?;
            let workspace = load_workspace(&cli.repo_path, cli.jobs, &cwd)?;
            wit::commands::add_dep(&workspace, &cwd, source, name, commit, package)
        }
        Command::UpdateDep { name, commit, source, package } => {
            wit::git::require_git_installed()?;
            let workspace = load_workspace(&cli.repo_path, cli.jobs, &cwd)?;
            wit::commands::update_dep(&workspace, &cwd, name, commit, source, package)
        }
    }
}

fn load_workspace(repo_path: &[std::path::PathBuf], jobs: usize, cwd: &std::path::Path) -> anyhow::Result<Workspace> {
    Ok(Workspace::find(cwd)?
        .with_jobs(jobs)
        .with_repo_paths(repo_path.to_vec()))
}
