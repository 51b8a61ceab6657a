// Exit command

use crate::shell::commands::Builtin;
use crate::shell::context::ShellContext;
use anyhow::Result;
use std::io::Write;

pub struct ExitCommand;

impl Builtin for ExitCommand {
    fn execute(&self, _args: &[String], _ctx: &mut ShellContext) -> Result<i32> {
        log::debug!("exit requested");
        std::io::stdout().flush().ok();
        std::io::stderr().flush().ok();
        std::process::exit(0);
    }
}
