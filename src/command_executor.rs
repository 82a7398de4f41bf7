//! command_executor.rs - Runs one external command with a timeout and classifies the outcome.
//!
//! Commands are argument vectors, never shell strings, so values such as
//! `{LSHandlerRoleAll="com.google.chrome";}` reach the preference tool
//! verbatim. Every failure mode (missing executable, timeout, non-zero exit)
//! comes back as the same `CommandOutput` shape; nothing here panics or
//! returns `Err` to the caller.

use crate::process_guard::{kill_process_tree, CommandProcessGroup};
use crate::report::Reporter;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Per-call timeout used when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A program plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The command as a POSIX-quoted line, for logs only.
    pub fn to_command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// Knobs for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Pipe stdout/stderr back to the caller instead of inheriting them
    pub capture_output: bool,
    /// Report a non-zero exit as an error instead of a warning
    pub strict: bool,
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            capture_output: false,
            strict: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RunOptions {
    /// Captured, non-strict run with the given timeout
    pub fn captured(timeout: Duration) -> Self {
        Self {
            capture_output: true,
            strict: false,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Why a command did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    /// The program could not be located on PATH
    #[error("command not found: {program}")]
    ExecutableNotFound { program: String },

    /// The program ran longer than the allowed timeout and was killed
    #[error("command timed out after {}s", timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    /// The program exited unsuccessfully (code is None when killed by a signal)
    #[error("command exited with {}", describe_exit(*code))]
    NonZeroExit {
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// Any other spawn or wait error
    #[error("failed to run command: {0}")]
    Spawn(String),
}

/// Result of one run: the (success, stdout, stderr) triple plus the failure class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub success: bool,
    /// Present only when output was captured and the command ran to completion
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub failure: Option<CommandFailure>,
}

impl CommandOutput {
    /// A successful run with whatever output was captured
    pub fn succeeded(stdout: Option<String>, stderr: Option<String>) -> Self {
        Self {
            success: true,
            stdout,
            stderr,
            failure: None,
        }
    }

    /// A failed run that produced no output (timeout, not found, spawn error)
    pub fn failed(failure: CommandFailure) -> Self {
        Self {
            success: false,
            stdout: None,
            stderr: None,
            failure: Some(failure),
        }
    }

    /// A run that exited non-zero
    pub fn exited(code: Option<i32>, stdout: Option<String>, stderr: Option<String>) -> Self {
        Self {
            success: false,
            stdout,
            failure: Some(CommandFailure::NonZeroExit {
                code,
                stderr: stderr.clone(),
            }),
            stderr,
        }
    }

    /// Trimmed stderr, if any non-whitespace was captured
    pub fn stderr_text(&self) -> Option<&str> {
        self.stderr
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Anything that can run a `CommandSpec`. The engine only talks to this trait.
pub trait CommandRunner {
    fn run(&self, command: &CommandSpec, options: RunOptions) -> CommandOutput;
}

/// Runs commands as real child processes.
pub struct SystemCommandRunner<'a> {
    reporter: &'a dyn Reporter,
}

impl<'a> SystemCommandRunner<'a> {
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        Self { reporter }
    }
}

impl CommandRunner for SystemCommandRunner<'_> {
    fn run(&self, command: &CommandSpec, options: RunOptions) -> CommandOutput {
        let line = command.to_command_line();
        self.reporter.debug(&format!("Running: {}", line));

        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments())
            .stdin(Stdio::null())
            .in_new_process_group();
        if options.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let deadline = Instant::now() + options.timeout;
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.reporter
                    .error(&format!("Command not found: {}", command.program()));
                return CommandOutput::failed(CommandFailure::ExecutableNotFound {
                    program: command.program().to_string(),
                });
            }
            Err(e) => {
                self.reporter
                    .error(&format!("Error running command '{}': {}", line, e));
                return CommandOutput::failed(CommandFailure::Spawn(e.to_string()));
            }
        };

        // Drain pipes on their own threads so a chatty child cannot block on a full pipe
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let status = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                terminate(&mut child);
                return self.timed_out(&line, options.timeout);
            }
            Err(e) => {
                terminate(&mut child);
                self.reporter
                    .error(&format!("Error waiting for command '{}': {}", line, e));
                return CommandOutput::failed(CommandFailure::Spawn(e.to_string()));
            }
        };

        // A background grandchild can hold the pipes open after the child exits
        let (Some(stdout), Some(stderr)) = (
            read_until(stdout_reader, deadline),
            read_until(stderr_reader, deadline),
        ) else {
            if let Err(e) = kill_process_tree(child.id()) {
                tracing::debug!("Failed to kill process group {}: {}", child.id(), e);
            }
            return self.timed_out(&line, options.timeout);
        };

        if status.success() {
            return CommandOutput::succeeded(stdout, stderr);
        }

        let output = CommandOutput::exited(status.code(), stdout, stderr);
        let exit = describe_exit(status.code());
        if options.strict {
            self.reporter
                .error(&format!("Command '{}' failed with {}.", line, exit));
            if let Some(stderr) = output.stderr_text() {
                self.reporter.error(&format!("Stderr: {}", stderr));
            }
        } else if !options.capture_output {
            // Capturing callers see stderr and report the failure themselves
            self.reporter
                .warn(&format!("Command failed ({}): {}", exit, line));
        }
        output
    }
}

impl SystemCommandRunner<'_> {
    fn timed_out(&self, line: &str, timeout: Duration) -> CommandOutput {
        self.reporter.error(&format!(
            "Command timed out after {}s: {}",
            timeout.as_secs_f64(),
            line
        ));
        CommandOutput::failed(CommandFailure::Timeout { timeout })
    }
}

type Responder = Box<dyn Fn(&CommandSpec) -> CommandOutput>;

/// Records every command with its options and answers from a closure.
///
/// Nothing is spawned. Used wherever the engine must be driven without
/// touching the real preference store.
pub struct RecordingRunner {
    calls: RefCell<Vec<(CommandSpec, RunOptions)>>,
    respond: Responder,
}

impl RecordingRunner {
    pub fn with(respond: impl Fn(&CommandSpec) -> CommandOutput + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Every command succeeds with empty captured output
    pub fn succeeding() -> Self {
        Self::with(|_| CommandOutput::succeeded(Some(String::new()), Some(String::new())))
    }

    /// Every command exits 1 with `stderr`
    pub fn failing_with(stderr: &'static str) -> Self {
        Self::with(move |_| {
            CommandOutput::exited(Some(1), Some(String::new()), Some(stderr.to_string()))
        })
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().iter().map(|(spec, _)| spec.clone()).collect()
    }

    /// Commands paired with the options they were run with
    pub fn invocations(&self) -> Vec<(CommandSpec, RunOptions)> {
        self.calls.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(spec, _)| spec.to_command_line())
            .collect()
    }

    /// Index of the first recorded command whose line starts with `prefix`
    pub fn first_index(&self, prefix: &str) -> Option<usize> {
        self.command_lines().iter().position(|l| l.starts_with(prefix))
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &CommandSpec, options: RunOptions) -> CommandOutput {
        self.calls.borrow_mut().push((command.clone(), options));
        (self.respond)(command)
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Collect a reader's output, or `None` if the pipe is still open at `deadline`.
///
/// `Some(None)` means the stream was not captured.
fn read_until(reader: Option<Receiver<String>>, deadline: Instant) -> Option<Option<String>> {
    let Some(rx) = reader else {
        return Some(None);
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(Some(text)),
        Err(RecvTimeoutError::Disconnected) => Some(Some(String::new())),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

/// Poll until the child exits or `deadline` passes (`Ok(None)`).
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child's process group and reap it.
fn terminate(child: &mut Child) {
    if let Err(e) = kill_process_tree(child.id()) {
        tracing::debug!("Failed to kill process group {}: {}", child.id(), e);
        let _ = child.kill();
    }
    let _ = child.wait();
}
