pub mod ast;
pub mod commands;
pub mod context;
pub mod executor;
pub mod parser;
pub mod process;
pub mod redirect;
pub mod status;
pub mod vars;
pub mod word;


use anyhow::Result;
use colored::*;
use context::ShellContext;
use std::io::{self, IsTerminal, Write};

/// Parses and evaluates one line of input, returning its exit status.
///
/// Blank lines and comments leave the previous status untouched.
pub fn run_line(line: &str, ctx: &mut ShellContext) -> Result<i32> {
    match parser::parse_line(line)? {
        Some(tree) => Ok(executor::evaluate(&tree, ctx)),
        None => Ok(ctx.exit_code),
    }
}

/// Writes a diagnostic to whatever stderr currently is, redirected or not.
pub(crate) fn report(message: &str) {
    let mut err = io::stderr();
    // Colour follows the current fd 2, so a redirected stderr gets plain text.
    let _ = if err.is_terminal() {
        writeln!(err, "{} {}", "forksh:".red().bold(), message)
    } else {
        writeln!(err, "forksh: {}", message)
    };
}
