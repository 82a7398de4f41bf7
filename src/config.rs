//! Run configuration with the defaults the tool ships with.

use crate::command_executor::DEFAULT_TIMEOUT;
use crate::restart::DEFAULT_RESTART_PROCESSES;
use std::path::PathBuf;
use std::time::Duration;

/// Directory under the home directory that holds timestamped backups
pub const BACKUP_ROOT_DIR: &str = "macos_settings_backup";

/// Settings editor that can overwrite freshly written preferences while open
pub const CONFLICTING_APPLICATION: &str = "System Settings";

/// Everything the orchestrator needs besides the catalog and capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Parent of the `backup_<timestamp>` directories
    pub backup_root: PathBuf,
    /// Per-command timeout
    pub timeout: Duration,
    pub restart_processes: Vec<String>,
    /// Application asked to quit before anything is written
    pub quit_application: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backup_root: default_backup_root(),
            timeout: DEFAULT_TIMEOUT,
            restart_processes: DEFAULT_RESTART_PROCESSES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            quit_application: Some(CONFLICTING_APPLICATION.to_string()),
        }
    }
}

impl EngineConfig {
    pub fn with_backup_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.backup_root = root.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `<home>/macos_settings_backup`, or a relative path if home is unknown
pub fn default_backup_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(BACKUP_ROOT_DIR))
        .unwrap_or_else(|| PathBuf::from(BACKUP_ROOT_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.restart_processes.len(), 4);
        assert_eq!(config.quit_application.as_deref(), Some("System Settings"));
        assert!(config.backup_root.ends_with(BACKUP_ROOT_DIR));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_backup_root("/tmp/prefs")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.backup_root, PathBuf::from("/tmp/prefs"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
