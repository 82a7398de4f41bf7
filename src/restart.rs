//! Restart of the UI processes that cache preferences.

use crate::command_executor::CommandSpec;
use crate::context::EngineContext;

/// Processes terminated after settings are written; launchd relaunches them.
pub const DEFAULT_RESTART_PROCESSES: &[&str] = &["Finder", "Dock", "SystemUIServer", "ControlCenter"];

/// `pkill -x <name>`
fn terminate_by_name(process: &str) -> CommandSpec {
    CommandSpec::new("pkill").args(["-x", process])
}

/// Signals a fixed list of processes to reload their preferences.
pub struct ServiceRestarter<'a> {
    ctx: EngineContext<'a>,
    processes: Vec<String>,
}

impl<'a> ServiceRestarter<'a> {
    pub fn new(ctx: EngineContext<'a>, processes: Vec<String>) -> Self {
        Self { ctx, processes }
    }

    /// Terminate each listed process by exact name.
    ///
    /// A process that is not running is normal. Returns whether at least one
    /// process was found and signalled.
    pub fn restart_services(&self) -> bool {
        let reporter = self.ctx.reporter;
        reporter.info("Applying changes by restarting relevant processes...");

        let mut killed_any = false;
        for process in &self.processes {
            let output = self
                .ctx
                .runner
                .run(&terminate_by_name(process), self.ctx.uncaptured());
            if output.success {
                reporter.info(&format!("Attempted restart for {}.", process));
                killed_any = true;
            }
        }

        if !killed_any {
            reporter.info("No relevant services found running to restart.");
        }
        reporter.info("Service restarts attempted.");
        reporter.info("Note: Some changes may require a logout or system restart.");
        killed_any
    }
}
