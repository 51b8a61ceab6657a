// Cd command

use crate::shell::commands::Builtin;
use crate::shell::context::ShellContext;
use crate::shell::status;
use crate::shell::vars::VarStore;
use anyhow::Result;

pub struct CdCommand;

impl Builtin for CdCommand {
    fn execute(&self, args: &[String], ctx: &mut ShellContext) -> Result<i32> {
        // args[0] is "cd". args[1] is path.
        let target = match args.get(1) {
            Some(path) => path.clone(),
            None => match ctx.get("HOME") {
                Some(home) => home,
                None => {
                    log::debug!("cd: HOME not set");
                    return Ok(status::FAILURE);
                }
            },
        };

        match std::env::set_current_dir(&target) {
            Ok(()) => {
                log::debug!("cd: now in {}", target);
                Ok(status::SUCCESS)
            }
            Err(e) => {
                log::debug!("cd: {}: {}", target, e);
                Ok(status::FAILURE)
            }
        }
    }
}
