//! command::executor
//!
//! Ownership of one spawned external process.
//!
//! # Design
//!
//! A [`CommandExecutor`] is created per invocation attempt and owns the
//! spawned process for its lifetime. Stdout and stderr are drained on
//! dedicated reader threads so a full pipe buffer can never deadlock the
//! child; stdout is additionally streamed line-by-line to an optional
//! [`LineSink`] as it arrives, so long-running operations report partial
//! progress before they finish.
//!
//! A retried call creates a new executor; a terminated process is never
//! reused.

use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::CommandError;

/// Receives decoded stdout lines as they are read.
///
/// Called from the reader thread, never the spawning thread.
pub trait LineSink: Send + Sync {
    fn line(&self, line: &str);
}

/// Everything extracted from one finished attempt.
#[derive(Debug)]
pub struct ExecutionOutput {
    /// Exit code, or -1 when the process died to a signal.
    pub exit_code: i32,
    /// Stdout decoded as text (lossy).
    pub stdout_text: String,
    /// Raw stdout bytes, for subcommands with binary output.
    pub stdout_raw: Vec<u8>,
    /// Stderr decoded as text (lossy).
    pub stderr_text: String,
    /// Whether the attempt was killed for exceeding its deadline.
    pub timed_out: bool,
}

impl ExecutionOutput {
    /// Plain success: clean exit, no deadline violation.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Owns one spawned process and its two reader threads.
pub struct CommandExecutor {
    child: Child,
    stdout_thread: Option<JoinHandle<io::Result<Vec<u8>>>>,
    stderr_thread: Option<JoinHandle<io::Result<Vec<u8>>>>,
}

impl CommandExecutor {
    /// Spawn the executable with the given arguments.
    ///
    /// Stdin is closed; the executable must never be able to prompt.
    pub fn spawn(
        program: &Path,
        args: &[String],
        working_dir: Option<&Path>,
        sink: Option<Arc<dyn LineSink>>,
    ) -> io::Result<Self> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn()?;
        debug!(program = %program.display(), pid = child.id(), "spawned");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

        let stdout_thread = thread::spawn(move || drain(stdout, sink));
        let stderr_thread = thread::spawn(move || drain(stderr, None));

        Ok(Self {
            child,
            stdout_thread: Some(stdout_thread),
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Process id of the spawned child.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Block until the process exits, is cancelled, or hits the deadline.
    ///
    /// Cancellation and the deadline are polled between child status
    /// checks. Either way the child is killed and reaped, never abandoned.
    ///
    /// # Errors
    ///
    /// `CommandError::Cancelled` when the cancellation check fires. A
    /// deadline violation is not an error here: the output is returned
    /// with `timed_out` set, and the caller decides (a runtime maps it to
    /// `CommandError::Timeout`; diagnostics may still want the partial
    /// output).
    pub fn wait(
        mut self,
        cancelled: &dyn Fn() -> bool,
        deadline: Option<Instant>,
    ) -> Result<ExecutionOutput, CommandError> {
        const POLL: Duration = Duration::from_millis(20);

        let timed_out = loop {
            if self.child.try_wait()?.is_some() {
                break false;
            }
            if cancelled() {
                debug!(pid = self.child.id(), "cancellation observed, killing child");
                let _ = self.child.kill();
                let _ = self.child.wait();
                self.join_readers();
                return Err(CommandError::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(pid = self.child.id(), "deadline elapsed, killing child");
                let _ = self.child.kill();
                break true;
            }
            thread::sleep(POLL);
        };

        let status = self.child.wait()?;
        let stdout_raw = join_reader(self.stdout_thread.take())?;
        let stderr_raw = join_reader(self.stderr_thread.take())?;

        Ok(ExecutionOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout_text: String::from_utf8_lossy(&stdout_raw).into_owned(),
            stdout_raw,
            stderr_text: String::from_utf8_lossy(&stderr_raw).into_owned(),
            timed_out,
        })
    }

    fn join_readers(&mut self) {
        for handle in [self.stdout_thread.take(), self.stderr_thread.take()] {
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
    }
}

/// Drain a pipe to completion, streaming decoded lines to the sink.
fn drain<R: Read>(stream: R, sink: Option<Arc<dyn LineSink>>) -> io::Result<Vec<u8>> {
    let mut reader = BufReader::new(stream);
    let mut raw = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&line);
        if let Some(sink) = &sink {
            let text = String::from_utf8_lossy(&line);
            sink.line(text.trim_end_matches(['\r', '\n']));
        }
    }
    Ok(raw)
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>, CommandError> {
    match handle {
        Some(handle) => Ok(handle
            .join()
            .map_err(|_| CommandError::Internal("output reader thread panicked".to_string()))??),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (
            PathBuf::from("/bin/sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    struct Lines(Mutex<Vec<String>>);

    impl LineSink for Lines {
        fn line(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    #[test]
    fn captures_streams_separately() {
        let (program, args) = sh("echo out; echo err >&2");
        let executor = CommandExecutor::spawn(&program, &args, None, None).unwrap();
        let output = executor.wait(&|| false, None).unwrap();

        assert!(output.success());
        assert_eq!(output.stdout_text.trim(), "out");
        assert_eq!(output.stderr_text.trim(), "err");
        assert!(!output.timed_out);
    }

    #[test]
    fn streams_lines_to_sink() {
        let sink = Arc::new(Lines(Mutex::new(Vec::new())));
        let (program, args) = sh("echo one; echo two");
        let executor =
            CommandExecutor::spawn(&program, &args, None, Some(sink.clone())).unwrap();
        executor.wait(&|| false, None).unwrap();

        assert_eq!(*sink.0.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn nonzero_exit_is_reported() {
        let (program, args) = sh("exit 3");
        let executor = CommandExecutor::spawn(&program, &args, None, None).unwrap();
        let output = executor.wait(&|| false, None).unwrap();

        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[test]
    fn raw_output_preserves_bytes() {
        let (program, args) = sh("printf 'a\\0b'");
        let executor = CommandExecutor::spawn(&program, &args, None, None).unwrap();
        let output = executor.wait(&|| false, None).unwrap();

        assert_eq!(output.stdout_raw, b"a\0b");
    }

    #[test]
    fn cancellation_kills_the_child() {
        let (program, args) = sh("sleep 30");
        let executor = CommandExecutor::spawn(&program, &args, None, None).unwrap();

        let started = Instant::now();
        let cancel_after = started + Duration::from_millis(100);
        let result = executor.wait(&|| Instant::now() >= cancel_after, None);

        assert!(matches!(result, Err(CommandError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn deadline_sets_timed_out() {
        let (program, args) = sh("sleep 30");
        let executor = CommandExecutor::spawn(&program, &args, None, None).unwrap();

        let started = Instant::now();
        let output = executor
            .wait(&|| false, Some(started + Duration::from_millis(100)))
            .unwrap();

        assert!(output.timed_out);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let result = CommandExecutor::spawn(
            Path::new("/nonexistent/svnbridge-test-binary"),
            &[],
            None,
            None,
        );
        assert!(result.is_err());
    }
}
