use crate::shell::ast::{Redirections, WriteMode};
use crate::shell::vars::VarStore;
use crate::shell::word::resolve;
use anyhow::{Context, Result};
use nix::unistd::dup2;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Input,
    Output,
    Error,
}

impl Stream {
    pub fn fd(self) -> RawFd {
        match self {
            Stream::Input => io::stdin().as_raw_fd(),
            Stream::Output => io::stdout().as_raw_fd(),
            Stream::Error => io::stderr().as_raw_fd(),
        }
    }

    // The copy is close-on-exec, so an exec'd image never inherits it.
    fn duplicate(self) -> io::Result<OwnedFd> {
        match self {
            Stream::Input => io::stdin().as_fd().try_clone_to_owned(),
            Stream::Output => io::stdout().as_fd().try_clone_to_owned(),
            Stream::Error => io::stderr().as_fd().try_clone_to_owned(),
        }
    }
}

/// Original standard streams set aside by [`apply`].
///
/// Restoring happens on [`SavedStreams::restore`] or, failing that, on drop,
/// so an early return never leaves a stream redirected or a descriptor open.
#[derive(Debug)]
pub struct SavedStreams {
    saved: Vec<(Stream, OwnedFd)>,
}

impl SavedStreams {
    fn empty() -> Self {
        Self { saved: Vec::new() }
    }

    /// Streams currently redirected, in the order they were installed.
    #[cfg(test)]
    pub fn redirected(&self) -> Vec<Stream> {
        self.saved.iter().map(|(stream, _)| *stream).collect()
    }

    fn install(&mut self, stream: Stream, file: &File) -> Result<()> {
        let original = stream
            .duplicate()
            .with_context(|| format!("failed to save {:?} stream", stream))?;
        dup2(file.as_raw_fd(), stream.fd())
            .with_context(|| format!("failed to redirect {:?} stream", stream))?;
        log::debug!("redirected {:?} (original kept as fd {})", stream, original.as_raw_fd());
        self.saved.push((stream, original));
        Ok(())
    }

    pub fn restore(mut self) -> Result<()> {
        self.restore_all()
    }

    fn restore_all(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some((stream, original)) = self.saved.pop() {
            if let Err(e) = dup2(original.as_raw_fd(), stream.fd()) {
                log::warn!("failed to restore {:?}: {}", stream, e);
                first_error.get_or_insert((stream, e));
            }
            // `original` is closed here.
        }
        match first_error {
            Some((stream, e)) => Err(e).with_context(|| format!("failed to restore {:?} stream", stream)),
            None => Ok(()),
        }
    }
}

impl Drop for SavedStreams {
    fn drop(&mut self) {
        if let Err(e) = self.restore_all() {
            log::error!("{:#}", e);
        }
    }
}

/// Installs the declared redirections over stdin/stdout/stderr.
///
/// When output and error resolve to the same path, the file is opened once in
/// append mode and shared by both streams.
pub fn apply(redirects: &Redirections, vars: &dyn VarStore) -> Result<SavedStreams> {
    let mut saved = SavedStreams::empty();
    if redirects.is_empty() {
        return Ok(saved);
    }

    if let Some(word) = &redirects.input {
        let path = resolve(word, vars);
        let file = File::open(&path).with_context(|| format!("{}: cannot open for reading", path))?;
        saved.install(Stream::Input, &file)?;
    }

    let output = redirects.output.as_ref().map(|t| (resolve(&t.path, vars), t.mode));
    let error = redirects.error.as_ref().map(|t| (resolve(&t.path, vars), t.mode));

    match (output, error) {
        (Some((out_path, out_mode)), Some((err_path, _))) if out_path == err_path => {
            let file = open_shared(&out_path, out_mode)?;
            saved.install(Stream::Output, &file)?;
            saved.install(Stream::Error, &file)?;
        }
        (output, error) => {
            if let Some((path, mode)) = output {
                let file = open_for_write(&path, mode)?;
                saved.install(Stream::Output, &file)?;
            }
            if let Some((path, mode)) = error {
                let file = open_for_write(&path, mode)?;
                saved.install(Stream::Error, &file)?;
            }
        }
    }

    Ok(saved)
}

fn open_for_write(path: &str, mode: WriteMode) -> Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).mode(0o644);
    match mode {
        WriteMode::Truncate => opts.truncate(true),
        WriteMode::Append => opts.append(true),
    };
    opts.open(path).with_context(|| format!("{}: cannot open for writing", path))
}

// One append-mode descriptor for both streams; truncated once up front if the
// output target asked for it.
fn open_shared(path: &str, out_mode: WriteMode) -> Result<File> {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o644)
        .open(path)
        .with_context(|| format!("{}: cannot open for writing", path))?;
    if out_mode == WriteMode::Truncate {
        file.set_len(0).with_context(|| format!("{}: cannot truncate", path))?;
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ast::{OutputTarget, Word};
    use crate::shell::test_support::{in_child, serial};
    use std::collections::HashMap;
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::MetadataExt;

    // Writes straight to the descriptor, bypassing the std handles and their locks.
    fn write_to(stream: Stream, bytes: &[u8]) -> bool {
        match stream.duplicate() {
            Ok(fd) => File::from(fd).write_all(bytes).is_ok(),
            Err(_) => false,
        }
    }

    fn identity(stream: Stream) -> (u64, u64) {
        let meta = File::from(stream.duplicate().unwrap()).metadata().unwrap();
        (meta.dev(), meta.ino())
    }

    fn identities() -> Vec<(u64, u64)> {
        [Stream::Input, Stream::Output, Stream::Error]
            .into_iter()
            .map(identity)
            .collect()
    }

    fn target(path: &std::path::Path, mode: WriteMode) -> OutputTarget {
        OutputTarget {
            path: Word::literal(path.to_str().unwrap()),
            mode,
        }
    }

    #[test]
    fn test_apply_then_restore_keeps_stream_identity() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "data").unwrap();
        let redirects = Redirections {
            input: Some(Word::literal(input.to_str().unwrap())),
            output: Some(target(&dir.path().join("out.txt"), WriteMode::Truncate)),
            error: Some(target(&dir.path().join("err.txt"), WriteMode::Append)),
        };

        let ok = in_child(|| {
            let vars: HashMap<String, String> = HashMap::new();
            let before = identities();
            let saved = match apply(&redirects, &vars) {
                Ok(saved) => saved,
                Err(_) => return false,
            };
            let during = identities();
            if saved.restore().is_err() {
                return false;
            }
            before != during && before == identities()
        });
        assert!(ok);
        assert!(dir.path().join("out.txt").exists());
        assert!(dir.path().join("err.txt").exists());
    }

    #[test]
    fn test_failed_apply_restores_earlier_redirections() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let redirects = Redirections {
            input: None,
            output: Some(target(&dir.path().join("out.txt"), WriteMode::Truncate)),
            error: Some(target(&dir.path().join("missing/err.txt"), WriteMode::Truncate)),
        };

        let ok = in_child(|| {
            let vars: HashMap<String, String> = HashMap::new();
            let before = identities();
            apply(&redirects, &vars).is_err() && before == identities()
        });
        assert!(ok);
        // output was opened before the error target failed
        assert!(dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_missing_input_fails_without_touching_streams() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let redirects = Redirections {
            input: Some(Word::literal(dir.path().join("nope").to_str().unwrap())),
            output: Some(target(&dir.path().join("out.txt"), WriteMode::Truncate)),
            error: None,
        };

        let ok = in_child(|| {
            let vars: HashMap<String, String> = HashMap::new();
            let before = identities();
            apply(&redirects, &vars).is_err() && before == identities()
        });
        assert!(ok);
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_same_path_shares_one_append_descriptor() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("both.log");
        fs::write(&log, "stale contents that must go\n").unwrap();
        let redirects = Redirections {
            input: None,
            output: Some(target(&log, WriteMode::Truncate)),
            // its own mode is ignored when sharing the output's path
            error: Some(target(&log, WriteMode::Truncate)),
        };

        let ok = in_child(|| {
            let vars: HashMap<String, String> = HashMap::new();
            let saved = match apply(&redirects, &vars) {
                Ok(saved) => saved,
                Err(_) => return false,
            };
            let wrote = write_to(Stream::Output, b"out\n")
                && write_to(Stream::Error, b"err\n")
                && write_to(Stream::Output, b"out again\n");
            saved.restore().is_ok() && wrote
        });
        assert!(ok);
        assert_eq!(fs::read_to_string(&log).unwrap(), "out\nerr\nout again\n");
    }

    #[test]
    fn test_append_mode_keeps_existing_contents() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        fs::write(&out, "first\n").unwrap();
        let redirects = Redirections {
            input: None,
            output: Some(target(&out, WriteMode::Append)),
            error: None,
        };

        let ok = in_child(|| {
            let vars: HashMap<String, String> = HashMap::new();
            let Ok(saved) = apply(&redirects, &vars) else { return false };
            let wrote = write_to(Stream::Output, b"second\n");
            saved.redirected() == vec![Stream::Output] && saved.restore().is_ok() && wrote
        });
        assert!(ok);
        assert_eq!(fs::read_to_string(&out).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_target_word_is_resolved_through_variables() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let mut vars = HashMap::new();
        vars.insert("DIR".to_string(), dir.path().to_str().unwrap().to_string());
        let path = Word(vec![
            crate::shell::ast::WordPart::Variable("DIR".to_string()),
            crate::shell::ast::WordPart::Literal("/resolved.txt".to_string()),
        ]);
        let redirects = Redirections {
            input: None,
            output: Some(OutputTarget { path, mode: WriteMode::Truncate }),
            error: None,
        };

        let ok = in_child(|| apply(&redirects, &vars).and_then(|s| s.restore()).is_ok());
        assert!(ok);
        assert!(dir.path().join("resolved.txt").exists());
    }
}
