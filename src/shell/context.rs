use std::collections::HashMap;
use std::sync::Arc;
use anyhow::Result;
use crate::shell::commands::Builtin;
use crate::shell::vars::{ProcessEnv, VarStore};

pub struct ShellContext {
    pub exit_code: i32,
    pub vars: ProcessEnv,
    pub registry: Arc<HashMap<String, Box<dyn Builtin>>>,
}

impl ShellContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            exit_code: 0,
            vars: ProcessEnv,
            registry: Arc::new(HashMap::new()),
        };
        crate::shell::commands::builtins::register_all_builtins(&mut ctx);
        ctx
    }

    pub fn register_command(&mut self, name: &str, command: Box<dyn Builtin>) {
        if let Some(map) = Arc::get_mut(&mut self.registry) {
            map.insert(name.to_string(), command);
        } else {
            // Registration only happens while the context is being built.
            log::warn!("builtin '{}' not registered: registry is shared", name);
        }
    }
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new()
    }
}

// `$?` is answered from the context, everything else from the process environment.
impl VarStore for ShellContext {
    fn get(&self, name: &str) -> Option<String> {
        if name == "?" {
            return Some(self.exit_code.to_string());
        }
        self.vars.get(name)
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.vars.set(name, value)
    }
}
