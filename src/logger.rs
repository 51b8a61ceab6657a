use env_logger::{Builder, Env};

pub const LOG_ENV: &str = "FORKSH_LOG";

/// Fallback filter when `FORKSH_LOG` is unset: warn, raised by each `-v`.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global logger. Output goes to stderr, never to the commands' stdout.
pub fn init(verbosity: u8) {
    let env = Env::default().filter_or(LOG_ENV, default_level(verbosity));
    // A second init (e.g. from tests) keeps the first logger.
    let _ = Builder::from_env(env).format_timestamp(None).try_init();
}
