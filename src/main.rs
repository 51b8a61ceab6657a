mod cli;
mod config;
mod handlers;
mod logger;
mod shell;

use clap::Parser;
use cli::Cli;
use colored::*;
use handlers::command;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let code = match command::handle_entry(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "❌".red(), e);
            shell::status::FAILURE
        }
    };
    std::io::stdout().flush().ok();
    std::process::exit(code);
}
