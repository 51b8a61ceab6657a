use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "forksh", version, about = "forksh: a small fork/exec command shell")]
pub struct Cli {
    /// Run a single command line and exit
    #[arg(short = 'c', long = "command", value_name = "CMD", conflicts_with = "script")]
    pub command: Option<String>,

    /// Script file to run line by line (default: read standard input)
    pub script: Option<PathBuf>,

    /// Configuration file (default: ./forksh.toml if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
