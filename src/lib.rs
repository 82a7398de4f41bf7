//! prefapply library
//!
//! Settings application engine: a typed setting model, batch backup of the
//! affected preference domains, apply dispatch with per-setting failure
//! isolation, and the phase orchestration around them.

pub mod backup;
pub mod catalog;
pub mod cli;
pub mod command_executor;
pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod orchestrator;
pub mod prefs_tool;
pub mod privilege;
pub mod process_guard;
pub mod report;
pub mod restart;
pub mod run_state;
pub mod sanity;
pub mod setting;

// Re-export main types for convenience
pub use backup::{artifact_name, is_domain_absent, BackupManager, BackupOutcome, BackupSummary};
pub use catalog::{collect_domains, Catalog, CatalogIssue};
pub use command_executor::{
    CommandFailure, CommandOutput, CommandRunner, CommandSpec, RecordingRunner, RunOptions,
    SystemCommandRunner,
};
pub use config::EngineConfig;
pub use context::EngineContext;
pub use error::{PrefApplyError, Result};
pub use group::SettingGroup;
pub use orchestrator::{Orchestrator, RunReport};
pub use privilege::{EffectiveUidGate, FixedPrivilege, PrivilegeGate};
pub use report::{RecordingReporter, Reporter, TracingReporter};
pub use restart::ServiceRestarter;
pub use run_state::{RunPhase, RunProgress};
pub use setting::{ApplyOutcome, DictEntry, Setting, SettingKind, TypeFlag};
