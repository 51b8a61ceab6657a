use anyhow::{Context, Result};
use colored::*;
use std::io::{self, BufRead, Write};
use crate::config::ForkshConfig;
use crate::shell::{self, context::ShellContext, status};

/// One shell session: the evaluation context plus the prompt shown to a terminal.
pub struct Session {
    ctx: ShellContext,
    prompt: String,
}

impl Session {
    pub fn new(config: &ForkshConfig) -> Result<Self> {
        let mut ctx = ShellContext::new();
        config.seed(&mut ctx)?;
        Ok(Self {
            ctx,
            prompt: config.prompt().to_string(),
        })
    }

    pub fn last_status(&self) -> i32 {
        self.ctx.exit_code
    }

    /// Evaluates one line. A syntax error is reported and yields status 2.
    pub fn run_line(&mut self, line: &str) -> i32 {
        match shell::run_line(line, &mut self.ctx) {
            Ok(code) => code,
            Err(e) => {
                shell::report(&format!("{:#}", e));
                self.ctx.exit_code = status::SYNTAX_ERROR;
                status::SYNTAX_ERROR
            }
        }
    }

    /// Reads and evaluates lines until end of input, returning the last status.
    pub fn run_reader<R: BufRead>(&mut self, mut reader: R, interactive: bool) -> Result<i32> {
        let mut line = Vec::new();
        loop {
            if interactive {
                let mut out = io::stdout();
                write!(out, "{}", self.prompt.bold())?;
                // Flushed before any fork so children never inherit a pending prompt.
                out.flush()?;
            }

            line.clear();
            let read = reader.read_until(b'\n', &mut line).context("Failed to read input")?;
            if read == 0 {
                if interactive {
                    println!();
                }
                break;
            }

            // Invalid UTF-8 is replaced rather than ending the session.
            let text = String::from_utf8_lossy(&line);
            let code = self.run_line(text.trim_end_matches(['\n', '\r']));
            log::debug!("line finished with status {}", code);
        }
        Ok(self.last_status())
    }
}
