pub mod builtins;

use crate::shell::context::ShellContext;
use anyhow::Result;

/// A command that runs inside the shell process instead of a new program image.
///
/// `args[0]` is the resolved verb, as with `argv`.
pub trait Builtin: Send + Sync {
    fn execute(&self, args: &[String], ctx: &mut ShellContext) -> Result<i32>;
}
