//! Pre-change snapshots of every preference domain a run will touch.
//!
//! Backups are write-only archives: one `defaults export` per domain into a
//! timestamped directory. Nothing in this crate reads them back.

use crate::context::EngineContext;
use crate::prefs_tool::{self, EXPORT_EXTENSION};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Stderr fragments the preference tool prints for a domain with no stored values.
///
/// This is a heuristic: the tool has no structured error codes, so an absent
/// domain whose message matches none of these is counted as a failure.
pub const DOMAIN_ABSENT_MARKERS: &[&str] = &["does not exist"];

/// True when export stderr says the domain simply is not there yet.
///
/// Recognized: any of [`DOMAIN_ABSENT_MARKERS`], or `Domain` together with `not found`.
pub fn is_domain_absent(stderr: &str) -> bool {
    DOMAIN_ABSENT_MARKERS.iter().any(|m| stderr.contains(m))
        || (stderr.contains("Domain") && stderr.contains("not found"))
}

/// Backup file name for `domain`: path separators become `_`.
///
/// Domains differing only in `/` vs `_` map to the same name.
pub fn artifact_name(domain: &str) -> String {
    format!("{}.{}", domain.replace('/', "_"), EXPORT_EXTENSION)
}

/// Classification of one domain export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    Succeeded,
    /// The domain has no prior state (not a failure)
    Skipped,
    Failed,
}

/// Per-bucket counts for one backup phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackupSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BackupSummary {
    fn record(&mut self, outcome: BackupOutcome) {
        match outcome {
            BackupOutcome::Succeeded => self.succeeded += 1,
            BackupOutcome::Skipped => self.skipped += 1,
            BackupOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

impl fmt::Display for BackupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Exports preference domains before anything is written.
pub struct BackupManager<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> BackupManager<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Export every domain in `domains` into `backup_dir`, creating it first.
    ///
    /// `domains` is already deduplicated; it is walked in sorted order.
    pub fn backup_domains(&self, domains: &BTreeSet<String>, backup_dir: &Path) -> BackupSummary {
        let reporter = self.ctx.reporter;
        reporter.info(&format!(
            "Backing up {} preference domains to {}...",
            domains.len(),
            backup_dir.display()
        ));

        let mut summary = BackupSummary::default();

        if let Err(e) = fs::create_dir_all(backup_dir) {
            reporter.error(&format!(
                "Could not create backup directory {}: {}",
                backup_dir.display(),
                e
            ));
            summary.failed = domains.len();
            reporter.info(&format!("Backup complete: {}.", summary));
            return summary;
        }

        for domain in domains {
            let outcome = self.backup_domain(domain, backup_dir);
            if outcome == BackupOutcome::Failed {
                reporter.warn(&format!("Could not back up domain '{}'.", domain));
            }
            summary.record(outcome);
        }

        reporter.info(&format!("Backup complete: {}.", summary));
        summary
    }

    fn backup_domain(&self, domain: &str, backup_dir: &Path) -> BackupOutcome {
        let path = backup_dir.join(artifact_name(domain));
        let Some(command) = prefs_tool::export(domain, &path) else {
            self.ctx.reporter.error(&format!(
                "Backup path for domain '{}' is not valid UTF-8: {}",
                domain,
                path.display()
            ));
            return BackupOutcome::Failed;
        };
        let output = self.ctx.runner.run(&command, self.ctx.captured());

        if output.success {
            BackupOutcome::Succeeded
        } else if output.stderr_text().is_some_and(is_domain_absent) {
            self.ctx
                .reporter
                .debug(&format!("Domain '{}' does not exist yet; nothing to back up.", domain));
            BackupOutcome::Skipped
        } else {
            BackupOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::{CommandOutput, RecordingRunner};
    use crate::privilege::FixedPrivilege;
    use crate::report::RecordingReporter;
    use tracing::Level;

    fn domains(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_artifact_name() {
        assert_eq!(artifact_name("com.apple.finder"), "com.apple.finder.plist");
        assert_eq!(artifact_name("a/b"), "a_b.plist");
        assert_eq!(
            artifact_name("com.apple.LaunchServices/com.apple.launchservices.secure"),
            "com.apple.LaunchServices_com.apple.launchservices.secure.plist"
        );
    }

    #[test]
    fn test_artifact_name_collision_is_not_prevented() {
        assert_eq!(artifact_name("a/b"), artifact_name("a_b"));
    }

    #[test]
    fn test_is_domain_absent() {
        assert!(is_domain_absent(
            "The domain/default pair of (com.example, x) does not exist"
        ));
        assert!(is_domain_absent("Domain com.example not found."));
        assert!(!is_domain_absent("Could not write domain com.example; exiting"));
        assert!(!is_domain_absent("domain not found"));
        assert!(!is_domain_absent(""));
    }

    #[test]
    fn test_backup_classifies_each_domain() {
        let runner = RecordingRunner::with(|spec| match spec.arguments()[1].as_str() {
            "com.example.ok" => CommandOutput::succeeded(Some(String::new()), Some(String::new())),
            "com.example.new" => CommandOutput::exited(
                Some(1),
                Some(String::new()),
                Some("Domain com.example.new not found.\n".to_string()),
            ),
            _ => CommandOutput::exited(Some(1), Some(String::new()), Some("permission denied".to_string())),
        });
        let reporter = RecordingReporter::new();
        let ctx = EngineContext::new(&runner, &FixedPrivilege(false), &reporter);
        let dir = tempfile::tempdir().unwrap();

        let summary = BackupManager::new(ctx).backup_domains(
            &domains(&["com.example.ok", "com.example.new", "com.example.bad"]),
            dir.path(),
        );

        assert_eq!(
            summary,
            BackupSummary {
                succeeded: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert!(reporter.contains(Level::WARN, "Could not back up domain 'com.example.bad'."));
        assert!(reporter.contains(
            Level::INFO,
            "Backup complete: 1 succeeded, 1 failed, 1 skipped."
        ));
    }

    #[test]
    fn test_non_utf8_backup_path_fails_domain_without_export() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let runner = RecordingRunner::succeeding();
        let reporter = RecordingReporter::new();
        let ctx = EngineContext::new(&runner, &FixedPrivilege(false), &reporter);
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(OsStr::from_bytes(b"backup_\xff"));

        let summary = BackupManager::new(ctx).backup_domains(&domains(&["com.example"]), &dir);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 0);
        assert!(runner.calls().is_empty());
        assert!(!reporter.messages_at(Level::ERROR).is_empty());
    }

    #[test]
    fn test_backup_creates_nested_directory_and_targets_it() {
        let runner = RecordingRunner::succeeding();
        let reporter = RecordingReporter::new();
        let ctx = EngineContext::new(&runner, &FixedPrivilege(false), &reporter);
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("archive").join("backup_20250101_120000");

        BackupManager::new(ctx).backup_domains(&domains(&["a/b", "com.apple.dock"]), &dir);

        assert!(dir.is_dir());
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        // Sorted walk
        assert_eq!(calls[0].arguments()[1], "a/b");
        assert_eq!(
            calls[0].arguments()[2],
            dir.join("a_b.plist").to_string_lossy()
        );
        assert_eq!(calls[1].arguments()[1], "com.apple.dock");
    }

    #[test]
    fn test_unusable_backup_directory_fails_every_domain_without_exporting() {
        let runner = RecordingRunner::succeeding();
        let reporter = RecordingReporter::new();
        let ctx = EngineContext::new(&runner, &FixedPrivilege(false), &reporter);
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();

        let summary = BackupManager::new(ctx)
            .backup_domains(&domains(&["x", "y"]), &blocker.join("backup"));

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total(), 2);
        assert!(runner.calls().is_empty());
        assert!(reporter.contains(Level::ERROR, "Could not create backup directory"));
    }
}
