//! Process-group isolation for external commands
//!
//! Every command the executor spawns becomes the leader of its own process
//! group. When a command overruns its timeout the whole group is killed, so
//! helpers forked by the preference tool (or by `osascript`) do not outlive
//! the run.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Send a signal to a process
fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Send a signal to an entire process group
/// Uses negative PID to signal all processes in the group
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Check if a process still exists (zombies included)
#[cfg(test)]
fn is_process_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// SIGKILL the process group led by `pid`, falling back to the single
/// process if the group signal fails.
pub fn kill_process_tree(pid: u32) -> Result<(), nix::Error> {
    match send_signal_to_group(pid, Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!("Group SIGKILL for {} failed ({}), signalling PID", pid, e);
            send_signal(pid, Signal::SIGKILL)
        }
    }
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Configure the command to run in its own process group
    /// This allows us to kill the entire process tree with a single signal
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        unsafe {
            self.pre_exec(|| {
                // PGID = child PID
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                // Linux only: die with the parent. macOS has no equivalent.
                #[cfg(target_os = "linux")]
                {
                    if nix::libc::prctl(nix::libc::PR_SET_PDEATHSIG, nix::libc::SIGTERM) == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                }

                Ok(())
            });
        }
        self
    }
}
