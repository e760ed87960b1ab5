mod commands;
mod logging;
mod utils;

use clap::{Args, Parser, Subcommand, ValueEnum};
use orch_installer_config::Action;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orch-installer")]
#[command(about = "Install, upgrade or uninstall the edge orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the orchestrator infrastructure
    Install(RunArgs),
    /// Upgrade an existing orchestrator, migrating legacy state
    Upgrade(RunArgs),
    /// Tear the orchestrator down in reverse stage order
    Uninstall(RunArgs),
    /// Check a config file without touching any infrastructure
    Validate {
        /// Installer config file
        #[arg(short, long, env = "ORCH_INSTALLER_CONFIG")]
        config: PathBuf,
    },
    /// Show the version
    Version,
}

/// Where the runtime state is written after every step phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateStore {
    /// Next to the runtime state file
    File,
    /// In the deployment's state bucket
    S3,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Installer config file
    #[arg(short, long, env = "ORCH_INSTALLER_CONFIG")]
    pub config: PathBuf,

    /// Runtime state file, created when missing
    #[arg(short = 's', long, default_value = "runtime-state.yaml")]
    pub runtime_state: PathBuf,

    /// Checkout root that module paths are relative to
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Directory for the installer log and per-step tool logs
    #[arg(long, default_value = ".logs")]
    pub log_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "ORCH_INSTALLER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Path to the terraform binary
    #[arg(long, env = "ORCH_INSTALLER_TERRAFORM", default_value = "terraform")]
    pub terraform: PathBuf,

    /// Keep generated variable and backend files for debugging
    #[arg(long)]
    pub keep_generated_files: bool,

    /// Plan only, do not change any infrastructure
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = StateStore::File)]
    pub state_store: StateStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Install(args) => commands::run::handle(Action::Install, args).await,
        Commands::Upgrade(args) => commands::run::handle(Action::Upgrade, args).await,
        Commands::Uninstall(args) => commands::run::handle(Action::Uninstall, args).await,
        Commands::Validate { config } => commands::validate::handle(&config),
        Commands::Version => {
            println!("orch-installer {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
