use anyhow::{Result, bail};
use std::collections::HashMap;

/// Read/write access to shell variables.
///
/// The engine only touches variables through this trait: the word resolver
/// reads, the assignment builtin writes.
pub trait VarStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str) -> Result<()>;
}

/// The process environment table.
///
/// Assignments land in `environ`, so forked children and exec'd programs
/// inherit them without any extra plumbing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl VarStore for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return None;
        }
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            bail!("invalid variable name: {:?}", name);
        }
        if value.contains('\0') {
            bail!("value for {} contains a NUL byte", name);
        }
        // SAFETY: the shell evaluates on a single thread; children get their
        // copy of the table through fork, never by concurrent access.
        unsafe { std::env::set_var(name, value) };
        Ok(())
    }
}

impl VarStore for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::test_support::serial;

    #[test]
    fn test_process_env_rejects_bad_names() {
        let mut env = ProcessEnv;
        assert!(env.set("", "x").is_err());
        assert!(env.set("A=B", "x").is_err());
        assert!(env.set("FORKSH_VARS_NUL", "a\0b").is_err());
        assert_eq!(env.get("A=B"), None);
    }

    #[test]
    fn test_process_env_set_and_get() {
        let _guard = serial();
        let mut env = ProcessEnv;
        env.set("FORKSH_VARS_ROUNDTRIP", "value").unwrap();
        assert_eq!(env.get("FORKSH_VARS_ROUNDTRIP").as_deref(), Some("value"));
    }
}
