// Variable assignment: NAME=value

use crate::shell::ast::WordPart;
use crate::shell::context::ShellContext;
use crate::shell::status;
use crate::shell::vars::VarStore;
use crate::shell::word::resolve_parts;
use anyhow::Result;

/// Resolves `value` and stores it under `name`, overwriting any prior value.
pub fn assign(name: &str, value: &[WordPart], ctx: &mut ShellContext) -> Result<i32> {
    let resolved = resolve_parts(value, ctx);
    match ctx.set(name, &resolved) {
        Ok(()) => {
            log::debug!("assigned {}={:?}", name, resolved);
            Ok(status::SUCCESS)
        }
        Err(e) => {
            log::warn!("assignment to {} failed: {:#}", name, e);
            Ok(status::FAILURE)
        }
    }
}
