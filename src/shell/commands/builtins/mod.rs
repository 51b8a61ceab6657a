pub mod assign;
pub mod cd;
pub mod exit;
pub mod truth;

use crate::shell::context::ShellContext;

/// Registers the builtins that never fork.
///
/// `cd` is not in the registry: it goes through the fork path so its
/// redirections are applied, and the parent changes directory afterwards.
pub fn register_all_builtins(ctx: &mut ShellContext) {
    ctx.register_command("exit", Box::new(exit::ExitCommand));
    ctx.register_command("quit", Box::new(exit::ExitCommand));
    ctx.register_command("true", Box::new(truth::TrueCommand));
    ctx.register_command("false", Box::new(truth::FalseCommand));
}
