//! Pre-flight checks for the runtime environment
//!
//! The platform check is the only hard precondition: the preference store
//! and the UI processes exist only on macOS. Missing helper binaries are
//! reported as warnings; the executor reports each failed invocation anyway.

use crate::error::{PrefApplyError, Result};
use crate::process_guard::CommandProcessGroup;
use crate::report::Reporter;
use std::process::{Command, Stdio};

/// `std::env::consts::OS` value of the supported platform
pub const TARGET_OS: &str = "macos";

/// External tools the engine invokes
const REQUIRED_BINARIES: &[&str] = &[
    "defaults",  // Preference store reads/writes/exports
    "pkill",     // Service restarts
    "osascript", // Quitting System Settings
];

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub os: String,
    pub missing_binaries: Vec<String>,
}

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .in_new_process_group()
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Fails with `UnsupportedPlatform` unless `os` is the target platform
pub fn check_platform(os: &str) -> Result<()> {
    if os == TARGET_OS {
        Ok(())
    } else {
        Err(PrefApplyError::UnsupportedPlatform(os.to_string()))
    }
}

/// Inspect the running system
pub fn verify_environment() -> SanityCheckResult {
    let missing_binaries = REQUIRED_BINARIES
        .iter()
        .filter(|binary| !binary_exists(binary))
        .map(|binary| binary.to_string())
        .collect();

    SanityCheckResult {
        os: std::env::consts::OS.to_string(),
        missing_binaries,
    }
}

/// Run once before any phase. Only an unsupported platform is an error.
pub fn run_preflight_checks(reporter: &dyn Reporter) -> Result<()> {
    reporter.debug("Running pre-flight checks...");

    check_platform(std::env::consts::OS)?;

    let result = verify_environment();
    for binary in &result.missing_binaries {
        reporter.warn(&format!(
            "Required tool '{}' not found in PATH; commands using it will fail.",
            binary
        ));
    }

    reporter.debug(&format!("Pre-flight checks passed on {}", result.os));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingReporter;

    #[test]
    fn test_binary_exists_sh() {
        assert!(binary_exists("sh"), "sh should be available");
    }

    #[test]
    fn test_binary_exists_nonexistent() {
        assert!(!binary_exists("this_binary_definitely_does_not_exist_12345"));
    }

    #[test]
    fn test_check_platform() {
        assert!(check_platform("macos").is_ok());
        let err = check_platform("linux").unwrap_err();
        assert!(matches!(err, PrefApplyError::UnsupportedPlatform(ref os) if os == "linux"));
    }

    #[test]
    fn test_preflight_matches_host() {
        let reporter = RecordingReporter::new();
        let result = run_preflight_checks(&reporter);
        assert_eq!(result.is_ok(), cfg!(target_os = "macos"));
    }
}
