use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Process exit code when not running on macOS
pub const EXIT_UNSUPPORTED_PLATFORM: u8 = 1;

/// Process exit code when the catalog cannot be loaded or fails validation
pub const EXIT_CATALOG_ERROR: u8 = 3;

/// prefapply - apply a catalog of macOS preference changes
#[derive(Parser, Debug)]
#[command(name = "prefapply")]
#[command(about = "Back up, apply and reload a declarative set of macOS preferences")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up, apply every group, restart UI processes (default)
    Apply(ApplyArgs),
    /// Load a catalog and list settings that would be rejected at apply time
    Validate {
        /// Catalog JSON file (built-in catalog if omitted)
        catalog: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ApplyArgs {
    /// Catalog JSON file (built-in catalog if omitted)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Directory that receives backup_<timestamp> folders
    #[arg(long)]
    pub backup_root: Option<PathBuf>,

    /// Per-command timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; bare `prefapply` means `apply` with defaults
    pub fn resolved_command(&self) -> Commands {
        match &self.command {
            Some(Commands::Apply(args)) => Commands::Apply(args.clone()),
            Some(Commands::Validate { catalog }) => Commands::Validate {
                catalog: catalog.clone(),
            },
            None => Commands::Apply(ApplyArgs::default()),
        }
    }
}
