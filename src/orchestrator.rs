//! Orchestrator
//!
//! Sequences one run: INIT → BACKUP → APPLY → RESTART → REPORT. Single
//! pass, no retries, no rollback. Individual setting, backup and restart
//! failures are reported and never change the course of the run.

use crate::backup::{BackupManager, BackupSummary};
use crate::catalog::collect_domains;
use crate::command_executor::CommandSpec;
use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::group::SettingGroup;
use crate::restart::ServiceRestarter;
use crate::run_state::{RunPhase, RunProgress};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const SEPARATOR: &str = "------------------------------";

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub backup_dir: PathBuf,
    pub backup: BackupSummary,
    /// At least one UI process was found and signalled
    pub restarted_any: bool,
    /// Phases in the order they were entered
    pub phases: Vec<RunPhase>,
    pub elapsed: Duration,
}

/// `<root>/backup_<YYYYMMDD_HHMMSS>`
pub fn backup_dir_for(root: &Path, started_at: &DateTime<Local>) -> PathBuf {
    root.join(format!("backup_{}", started_at.format("%Y%m%d_%H%M%S")))
}

pub struct Orchestrator<'a> {
    ctx: EngineContext<'a>,
    config: EngineConfig,
    groups: &'a [SettingGroup],
}

impl<'a> Orchestrator<'a> {
    /// `config.timeout` overrides the context's per-command timeout.
    pub fn new(ctx: EngineContext<'a>, config: EngineConfig, groups: &'a [SettingGroup]) -> Self {
        Self {
            ctx: ctx.with_timeout(config.timeout),
            config,
            groups,
        }
    }

    pub fn run(&self) -> RunReport {
        let reporter = self.ctx.reporter;
        let started_at = Local::now();
        let clock = Instant::now();
        let mut progress = RunProgress::new();

        reporter.info("Applying macOS settings...");
        self.quit_conflicting_application();

        let backup_dir = backup_dir_for(&self.config.backup_root, &started_at);
        let domains = collect_domains(self.groups);

        self.enter(&mut progress, RunPhase::Backup);
        let backup = BackupManager::new(self.ctx).backup_domains(&domains, &backup_dir);
        reporter.info(SEPARATOR);

        self.enter(&mut progress, RunPhase::Apply);
        reporter.info("Applying settings...");
        for group in self.groups {
            group.apply(&self.ctx);
        }
        reporter.info(SEPARATOR);

        self.enter(&mut progress, RunPhase::Restart);
        let restarted_any =
            ServiceRestarter::new(self.ctx, self.config.restart_processes.clone()).restart_services();
        reporter.info(SEPARATOR);

        self.enter(&mut progress, RunPhase::Report);
        let elapsed = clock.elapsed();
        reporter.info(&format!("Finished in {:.2} seconds.", elapsed.as_secs_f64()));
        reporter.info(&format!("Backups saved to: {}", backup_dir.display()));
        reporter.info("Review warnings/errors above. Logout/restart may be needed.");

        RunReport {
            backup_dir,
            backup,
            restarted_any,
            phases: progress.phases(),
            elapsed,
        }
    }

    fn enter(&self, progress: &mut RunProgress, phase: RunPhase) {
        match progress.transition_to(phase) {
            Ok(phase) => self.ctx.reporter.debug(&format!("Phase: {}", phase)),
            Err(e) => self.ctx.reporter.error(&format!("Phase transition failed: {}", e)),
        }
    }

    /// Best effort; the executor reports any failure and the run continues.
    fn quit_conflicting_application(&self) {
        let Some(app) = &self.config.quit_application else {
            return;
        };
        self.ctx.reporter.info(&format!("Closing {}...", app));
        let command = CommandSpec::new("osascript")
            .arg("-e")
            .arg(format!("tell application \"{}\" to quit", app));
        self.ctx.runner.run(&command, self.ctx.uncaptured());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::RecordingRunner;
    use crate::privilege::FixedPrivilege;
    use crate::report::RecordingReporter;
    use crate::setting::{Setting, TypeFlag};
    use chrono::TimeZone;
    use tracing::Level;

    #[test]
    fn test_backup_dir_for_formats_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            backup_dir_for(Path::new("/Users/me/macos_settings_backup"), &at),
            PathBuf::from("/Users/me/macos_settings_backup/backup_20240309_070501")
        );
    }

    #[test]
    fn test_run_sequences_phases_and_commands() {
        let runner = RecordingRunner::succeeding();
        let reporter = RecordingReporter::new();
        let ctx = EngineContext::new(&runner, &FixedPrivilege(false), &reporter);
        let root = tempfile::tempdir().unwrap();

        let groups = vec![
            SettingGroup::new(
                "G1",
                vec![Setting::scalar("com.example.a", "key1", TypeFlag::Bool, "true")],
            ),
            SettingGroup::new("G2", vec![Setting::array_add("com.example.a", "key2", "x")]),
        ];
        let config = EngineConfig::default().with_backup_root(root.path());

        let report = Orchestrator::new(ctx, config, &groups).run();

        assert_eq!(report.phases, RunPhase::all_phases());
        assert_eq!(report.backup.succeeded, 1);
        assert!(report.restarted_any);
        assert!(report.backup_dir.starts_with(root.path()));

        let programs: Vec<String> = runner
            .calls()
            .iter()
            .map(|c| format!("{} {}", c.program(), c.arguments()[0]))
            .collect();
        assert_eq!(
            programs,
            vec![
                "osascript -e",
                "defaults export",
                "defaults write",
                "defaults write",
                "pkill -x",
                "pkill -x",
                "pkill -x",
                "pkill -x",
            ]
        );
        assert!(reporter.contains(Level::INFO, "Backups saved to:"));
        assert!(reporter.contains(Level::INFO, "Finished in"));
    }

    #[test]
    fn test_configured_timeout_and_capture_modes_reach_runner() {
        let runner = RecordingRunner::succeeding();
        let reporter = RecordingReporter::new();
        let ctx = EngineContext::new(&runner, &FixedPrivilege(false), &reporter);
        let root = tempfile::tempdir().unwrap();
        let timeout = Duration::from_secs(7);
        let config = EngineConfig::default()
            .with_backup_root(root.path())
            .with_timeout(timeout);
        let groups = vec![SettingGroup::new(
            "G",
            vec![Setting::scalar("com.example.a", "k", TypeFlag::Int, "1")],
        )];

        Orchestrator::new(ctx, config, &groups).run();

        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 7);
        for (spec, options) in &invocations {
            assert_eq!(options.timeout, timeout, "{}", spec);
            assert!(!options.strict, "{}", spec);
            // Backups and writes inspect stderr; quit and restarts inherit stdio
            let captured = spec.program() == "defaults";
            assert_eq!(options.capture_output, captured, "{}", spec);
        }
    }

    #[test]
    fn test_quit_can_be_disabled() {
        let runner = RecordingRunner::succeeding();
        let reporter = RecordingReporter::new();
        let ctx = EngineContext::new(&runner, &FixedPrivilege(false), &reporter);
        let root = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default().with_backup_root(root.path());
        config.quit_application = None;
        config.restart_processes.clear();

        let report = Orchestrator::new(ctx, config, &[]).run();

        assert!(runner.calls().is_empty());
        assert!(!report.restarted_any);
        assert_eq!(report.backup.total(), 0);
    }
}
