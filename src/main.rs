use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use protonge::commands;

#[derive(Parser)]
#[clap(name = "protonge")]
#[clap(about = "GE-Proton release manager for Steam")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Show debug logging on stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installable GE-Proton releases from GitHub
    Available {
        /// Also show the archive that would be downloaded
        #[clap(long)]
        assets: bool,
    },
    /// List installed GE-Proton versions
    List {
        /// Install directory (default: configured or detected Steam directory)
        #[clap(long)]
        dir: Option<PathBuf>,
    },
    /// Download and install a release
    Install {
        /// Release tag to install (e.g., GE-Proton9-5, latest)
        tag: Option<String>,
        /// Install from a local .tar.gz instead of downloading
        #[clap(long, conflicts_with = "tag")]
        file: Option<PathBuf>,
        /// Install directory (default: configured or detected Steam directory)
        #[clap(long)]
        dir: Option<PathBuf>,
        /// Reinstall even if the release folder already exists
        #[clap(long)]
        force: bool,
    },
    /// Remove an installed version
    Uninstall {
        /// Folder name of the installed version
        name: String,
        /// Install directory (default: configured or detected Steam directory)
        #[clap(long)]
        dir: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[clap(short, long)]
        yes: bool,
    },
    /// Show the install directory and configuration in use
    Dir,
}

fn initialize_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Available { assets } => commands::available::list_available_releases(assets)
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::List { dir } => {
            commands::list::list_installed(dir.as_deref()).map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Install {
            tag,
            file,
            dir,
            force,
        } => commands::install::install(commands::install::InstallArgs {
            tag,
            file,
            dir,
            force,
        })
        .await
        .map_err(|e| anyhow::anyhow!(e)),
        Commands::Uninstall { name, dir, yes } => {
            commands::uninstall::uninstall(&name, dir.as_deref(), yes)
                .map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Dir => commands::dir::show_install_dir().map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
