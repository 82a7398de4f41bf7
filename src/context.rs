//! The capabilities every engine component is handed explicitly.

use crate::command_executor::{CommandRunner, RunOptions, DEFAULT_TIMEOUT};
use crate::privilege::PrivilegeGate;
use crate::report::Reporter;
use std::time::Duration;

/// Executor, privilege gate and reporter for one run, plus the per-command timeout.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub privilege: &'a dyn PrivilegeGate,
    pub reporter: &'a dyn Reporter,
    pub timeout: Duration,
}

impl<'a> EngineContext<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        privilege: &'a dyn PrivilegeGate,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            runner,
            privilege,
            reporter,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Non-strict run that captures stdout/stderr
    pub fn captured(&self) -> RunOptions {
        RunOptions::captured(self.timeout)
    }

    /// Non-strict run with inherited stdio
    pub fn uncaptured(&self) -> RunOptions {
        RunOptions::default().with_timeout(self.timeout)
    }
}
