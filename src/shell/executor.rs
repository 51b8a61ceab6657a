use crate::shell::ast::{CommandTree, Operator, SimpleCommand};
use crate::shell::commands::Builtin;
use crate::shell::commands::builtins::assign::assign;
use crate::shell::commands::builtins::cd::CdCommand;
use crate::shell::context::ShellContext;
use crate::shell::redirect::{self, Stream};
use crate::shell::word::resolve;
use crate::shell::{process, report, status};
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::unistd::{dup2, execvp, pipe};
use std::ffi::CString;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};

/// Evaluates a command tree and returns its exit status.
///
/// The status is also recorded in `ctx.exit_code`, where `$?` reads it.
pub fn evaluate(tree: &CommandTree, ctx: &mut ShellContext) -> i32 {
    let code = match tree {
        CommandTree::Leaf(cmd) => or_report(execute_simple(cmd, ctx)),
        CommandTree::Node { op, left, right } => match op {
            Operator::Sequence => {
                evaluate(left, ctx);
                evaluate(right, ctx)
            }
            Operator::And => {
                let first = evaluate(left, ctx);
                if first == status::SUCCESS { evaluate(right, ctx) } else { first }
            }
            Operator::Or => {
                let first = evaluate(left, ctx);
                if first != status::SUCCESS { evaluate(right, ctx) } else { first }
            }
            Operator::Pipe => or_report(
                Channel::open().and_then(|channel| run_concurrently(left, right, ctx, Some(channel), last_stage)),
            ),
            Operator::Parallel => or_report(run_concurrently(left, right, ctx, None, completion)),
        },
    };
    ctx.exit_code = code;
    code
}

fn or_report(result: Result<i32>) -> i32 {
    result.unwrap_or_else(|e| {
        report(&format!("{:#}", e));
        status::FAILURE
    })
}

// A pipeline reports its consumer's status.
fn last_stage(_producer: i32, consumer: i32) -> i32 {
    consumer
}

// Parallel only promises that both sides finished.
fn completion(_left: i32, _right: i32) -> i32 {
    status::SUCCESS
}

/// Runs one simple command: assignment, in-process builtin, or a forked program.
pub fn execute_simple(cmd: &SimpleCommand, ctx: &mut ShellContext) -> Result<i32> {
    if let Some((name, value)) = cmd.verb.as_assignment() {
        return assign(name, value, ctx);
    }

    let mut argv = vec![resolve(&cmd.verb, ctx)];
    argv.extend(cmd.params.iter().map(|p| resolve(p, ctx)));

    let registry = ctx.registry.clone();
    if let Some(builtin) = registry.get(argv[0].as_str()) {
        log::debug!("builtin: {}", argv[0]);
        return builtin.execute(&argv, ctx);
    }

    let is_cd = argv[0] == "cd";
    let child = process::spawn(|| run_child(cmd, &argv, is_cd, ctx))
        .with_context(|| format!("{}: cannot start", argv[0]))?;
    let child_status = process::wait_for(child)?;

    // The cd child only applies redirections; a failure there aborts the command.
    if is_cd && child_status == status::SUCCESS {
        // Only the parent's directory change outlives this command.
        let cd_status = CdCommand.execute(&argv, ctx)?;
        if cd_status != status::SUCCESS {
            return Ok(cd_status);
        }
    }
    Ok(child_status)
}

fn run_child(cmd: &SimpleCommand, argv: &[String], is_cd: bool, ctx: &ShellContext) -> i32 {
    let saved = match redirect::apply(&cmd.redirects, ctx) {
        Ok(saved) => saved,
        Err(e) => {
            report(&format!("{:#}", e));
            return status::FAILURE;
        }
    };

    if is_cd {
        return match saved.restore() {
            Ok(()) => status::SUCCESS,
            Err(e) => {
                report(&format!("{:#}", e));
                status::FAILURE
            }
        };
    }

    // Only returns if the exec failed; `saved` restores the streams on drop.
    exec_program(argv)
}

fn exec_program(argv: &[String]) -> i32 {
    let args = match argv.iter().map(|a| CString::new(a.as_bytes())).collect::<Result<Vec<_>, _>>() {
        Ok(args) => args,
        Err(_) => {
            report(&format!("{}: argument contains a NUL byte", argv[0]));
            return status::CANNOT_EXECUTE;
        }
    };

    // The Rust runtime ignores SIGPIPE; exec'd programs expect the default.
    // SAFETY: SIG_DFL installs no handler code.
    if let Err(e) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
        log::warn!("could not reset SIGPIPE: {}", e);
    }

    log::debug!("exec {:?}", argv);
    let Err(errno) = execvp(&args[0], &args);
    match errno {
        Errno::ENOENT => {
            report(&format!("{}: command not found", argv[0]));
            status::NOT_FOUND
        }
        other => {
            report(&format!("{}: {}", argv[0], other.desc()));
            status::CANNOT_EXECUTE
        }
    }
}

// Both ends of an anonymous pipe, handed to the two sides of a pipeline.
struct Channel {
    reader: Option<OwnedFd>,
    writer: Option<OwnedFd>,
}

impl Channel {
    fn open() -> Result<Self> {
        let (reader, writer) = pipe().context("failed to create pipe")?;
        Ok(Self {
            reader: Some(reader),
            writer: Some(writer),
        })
    }

    // Producer side: stdout becomes the write end, both original ends are closed.
    fn attach_writer(&mut self) -> Result<()> {
        drop(self.reader.take());
        let writer = self.writer.take().context("pipe write end already taken")?;
        attach(writer, Stream::Output)
    }

    // Consumer side: stdin becomes the read end.
    fn attach_reader(&mut self) -> Result<()> {
        drop(self.writer.take());
        let reader = self.reader.take().context("pipe read end already taken")?;
        attach(reader, Stream::Input)
    }
}

fn attach(end: OwnedFd, stream: Stream) -> Result<()> {
    let target = stream.fd();
    if end.as_raw_fd() == target {
        // Already in place; keep it open.
        let _ = end.into_raw_fd();
        return Ok(());
    }
    dup2(end.as_raw_fd(), target).with_context(|| format!("failed to attach pipe to {:?}", stream))?;
    Ok(())
}

// Forks one child per subtree and waits for both.
//
// With a channel, the left child writes into it and the right child reads from it.
// The parent's copies of both ends are closed before waiting so the reader sees EOF.
fn run_concurrently(
    left: &CommandTree,
    right: &CommandTree,
    ctx: &mut ShellContext,
    mut channel: Option<Channel>,
    combine: fn(i32, i32) -> i32,
) -> Result<i32> {
    let first = process::spawn(|| {
        if let Some(channel) = channel.as_mut() {
            if let Err(e) = channel.attach_writer() {
                report(&format!("{:#}", e));
                return status::FAILURE;
            }
        }
        evaluate(left, ctx)
    })?;

    let second = process::spawn(|| {
        if let Some(channel) = channel.as_mut() {
            if let Err(e) = channel.attach_reader() {
                report(&format!("{:#}", e));
                return status::FAILURE;
            }
        }
        evaluate(right, ctx)
    });
    drop(channel);

    let second = match second {
        Ok(pid) => pid,
        Err(e) => {
            if let Err(wait_err) = process::wait_for(first) {
                log::warn!("{:#}", wait_err);
            }
            return Err(e);
        }
    };

    let left_status = process::wait_for(first)?;
    let right_status = process::wait_for(second)?;
    log::debug!("children finished: {} / {}", left_status, right_status);
    Ok(combine(left_status, right_status))
}
