use anyhow::{Context, Result, bail};
use colored::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use crate::shell::vars::VarStore;

pub const CONFIG_FILE: &str = "forksh.toml";
pub const DEFAULT_PROMPT: &str = "forksh$ ";

#[derive(Debug, Deserialize, Default)]
pub struct ForkshConfig {
    #[serde(default)]
    pub shell: ShellSection,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ShellSection {
    pub prompt: Option<String>,
}

impl ForkshConfig {
    pub fn prompt(&self) -> &str {
        self.shell.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
    }

    /// Seeds every configured variable into `vars`.
    pub fn seed(&self, vars: &mut dyn VarStore) -> Result<()> {
        let mut keys: Vec<_> = self.env.keys().collect();
        keys.sort();
        for key in keys {
            vars.set(key, &self.env[key])
                .with_context(|| format!("Failed to seed variable {} from config", key))?;
        }
        Ok(())
    }
}

/// `.env`, or `.env.<profile>` when `FORKSH_ENV` names one.
pub fn env_file_name(profile: Option<&str>) -> String {
    match profile {
        Some(p) if !p.is_empty() => format!(".env.{}", p),
        _ => ".env".to_string(),
    }
}

pub fn load_config(dir: &Path, explicit: Option<&Path>) -> Result<ForkshConfig> {
    let profile = env::var("FORKSH_ENV").ok();
    load_config_with_profile(dir, explicit, profile.as_deref())
}

fn load_config_with_profile(dir: &Path, explicit: Option<&Path>, profile: Option<&str>) -> Result<ForkshConfig> {
    // 1. forksh.toml (Base Layer)
    let config_path: Option<PathBuf> = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("❌ Config file {:?} not found.", path);
            }
            Some(path.to_path_buf())
        }
        None => Some(dir.join(CONFIG_FILE)).filter(|p| p.exists()),
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => ForkshConfig::default(),
    };

    // 2. .env (Override Layer)
    let env_filename = env_file_name(profile);
    let env_path = dir.join(&env_filename);

    if env_path.exists() {
        log::info!("{} Loading environment from: {}", "🌿".green(), env_filename.bold());
        for item in dotenvy::from_path_iter(&env_path)? {
            let (key, val) = item?;
            // .env overrides forksh.toml
            config.env.insert(key, val);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_give_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_with_profile(dir.path(), None, None).unwrap();
        assert_eq!(config.prompt(), DEFAULT_PROMPT);
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config_with_profile(dir.path(), Some(&missing), None).is_err());
    }

    #[test]
    fn test_toml_then_dotenv_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[shell]\nprompt = \"> \"\n\n[env]\nGREETING = \"hello\"\nTARGET = \"world\"\n",
        )
        .unwrap();
        fs::write(dir.path().join(".env"), "TARGET=dotenv\n").unwrap();

        let config = load_config_with_profile(dir.path(), None, None).unwrap();
        assert_eq!(config.prompt(), "> ");
        assert_eq!(config.env["GREETING"], "hello");
        assert_eq!(config.env["TARGET"], "dotenv");
    }

    #[test]
    fn test_profile_selects_env_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "MODE=default\n").unwrap();
        fs::write(dir.path().join(".env.ci"), "MODE=ci\n").unwrap();

        let config = load_config_with_profile(dir.path(), None, Some("ci")).unwrap();
        assert_eq!(config.env["MODE"], "ci");
        assert_eq!(env_file_name(Some("")), ".env");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[shell\nprompt = 1").unwrap();
        assert!(load_config_with_profile(dir.path(), Some(&path), None).is_err());
    }

    #[test]
    fn test_seed_sets_every_variable() {
        let mut config = ForkshConfig::default();
        config.env.insert("A".to_string(), "1".to_string());
        config.env.insert("B".to_string(), "2".to_string());

        let mut vars: HashMap<String, String> = HashMap::new();
        config.seed(&mut vars).unwrap();
        assert_eq!(vars.get("A").map(String::as_str), Some("1"));
        assert_eq!(vars.get("B").map(String::as_str), Some("2"));
    }
}
