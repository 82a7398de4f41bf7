//! prefapply - main entry point
//!
//! Parses arguments, sets up logging, and dispatches to `apply` or `validate`.
//! Only `apply` requires macOS; `validate` just parses the catalog.

use anyhow::Context;
use prefapply::cli::{ApplyArgs, Cli, Commands, EXIT_CATALOG_ERROR, EXIT_UNSUPPORTED_PLATFORM};
use prefapply::{
    sanity, Catalog, EffectiveUidGate, EngineConfig, EngineContext, Orchestrator, Reporter,
    SystemCommandRunner, TracingReporter,
};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize logging: `info` by default, `debug` with --verbose, RUST_LOG overrides both
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    match path {
        Some(path) => Catalog::load_from_file(path)
            .with_context(|| format!("Failed to load catalog from {:?}", path)),
        None => Catalog::builtin().context("Built-in catalog is invalid"),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    let reporter = TracingReporter;

    match cli.resolved_command() {
        Commands::Apply(args) => run_apply(&args, &reporter),
        Commands::Validate { catalog } => run_validate(catalog.as_deref(), &reporter),
    }
}

fn run_apply(args: &ApplyArgs, reporter: &dyn Reporter) -> ExitCode {
    if let Err(e) = sanity::run_preflight_checks(reporter) {
        reporter.error(&e.to_string());
        return ExitCode::from(EXIT_UNSUPPORTED_PLATFORM);
    }

    let catalog = match load_catalog(args.catalog.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            reporter.error(&format!("{:#}", e));
            return ExitCode::from(EXIT_CATALOG_ERROR);
        }
    };

    let mut config = EngineConfig::default();
    if let Some(root) = &args.backup_root {
        config = config.with_backup_root(root);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let runner = SystemCommandRunner::new(reporter);
    let privilege = EffectiveUidGate;
    let ctx = EngineContext::new(&runner, &privilege, reporter);

    // Individual failures are in the log; the exit status does not reflect them
    Orchestrator::new(ctx, config, catalog.groups()).run();
    ExitCode::SUCCESS
}

fn run_validate(path: Option<&Path>, reporter: &dyn Reporter) -> ExitCode {
    let catalog = match load_catalog(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            reporter.error(&format!("{:#}", e));
            return ExitCode::from(EXIT_CATALOG_ERROR);
        }
    };

    let issues = catalog.validate();
    if issues.is_empty() {
        reporter.info(&format!(
            "Catalog is valid: {} groups, {} settings, {} domains.",
            catalog.groups().len(),
            catalog.setting_count(),
            catalog.domains().len()
        ));
        return ExitCode::SUCCESS;
    }

    for issue in &issues {
        reporter.error(&issue.to_string());
    }
    reporter.error(&format!("Catalog has {} invalid setting(s).", issues.len()));
    ExitCode::from(EXIT_CATALOG_ERROR)
}
