use crate::shell::commands::Builtin;
use crate::shell::context::ShellContext;
use crate::shell::status;
use anyhow::Result;

pub struct TrueCommand;

impl Builtin for TrueCommand {
    fn execute(&self, _args: &[String], _ctx: &mut ShellContext) -> Result<i32> {
        Ok(status::SUCCESS)
    }
}

pub struct FalseCommand;

impl Builtin for FalseCommand {
    fn execute(&self, _args: &[String], _ctx: &mut ShellContext) -> Result<i32> {
        Ok(status::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_false_statuses() {
        let mut ctx = ShellContext::new();
        let args = vec!["true".to_string(), "ignored".to_string()];
        assert_eq!(TrueCommand.execute(&args, &mut ctx).unwrap(), 0);
        assert_eq!(FalseCommand.execute(&args, &mut ctx).unwrap(), 1);
    }

    #[test]
    fn test_registry_holds_in_process_builtins() {
        let ctx = ShellContext::new();
        for name in ["exit", "quit", "true", "false"] {
            assert!(ctx.registry.contains_key(name), "missing {}", name);
        }
        assert!(!ctx.registry.contains_key("cd"));
    }
}
