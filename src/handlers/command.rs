use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use crate::cli::Cli;
use crate::config::load_config;
use crate::handlers::session::Session;

/// Dispatches on the CLI mode and returns the status the process should exit with.
pub fn handle_entry(cli: Cli) -> Result<i32> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let config = load_config(&cwd, cli.config.as_deref())?;
    let mut session = Session::new(&config)?;

    if let Some(line) = cli.command {
        log::debug!("running -c command");
        return Ok(session.run_line(&line));
    }

    if let Some(path) = cli.script {
        let file = File::open(&path).with_context(|| format!("Failed to open script {}", path.display()))?;
        log::info!("running script {}", path.display());
        return session.run_reader(BufReader::new(file), false);
    }

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    session.run_reader(stdin.lock(), interactive)
}
