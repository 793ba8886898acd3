//! CLI frontend for the Telain battle engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "telain",
    about = "Telain: turn-based troop battles",
    version,
    propagate_version = true
)]
struct Cli {
    /// Print engine diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Auto-resolve a battle described by a JSON configuration file
    Battle {
        /// Battle configuration (JSON)
        file: PathBuf,

        #[command(flatten)]
        opts: commands::RunOptions,
    },

    /// Validate a battle configuration and show the opening turn order
    Check {
        /// Battle configuration (JSON)
        file: PathBuf,
    },

    /// Muster rosters from the unit catalog and fight them out
    Skirmish {
        /// Allied unit as TYPE:COUNT (repeatable)
        #[arg(short, long = "ally", required = true)]
        allies: Vec<String>,

        /// Enemy unit as TYPE:COUNT (repeatable)
        #[arg(short, long = "enemy", required = true)]
        enemies: Vec<String>,

        #[command(flatten)]
        opts: commands::RunOptions,
    },

    /// List the troop types in the unit catalog
    Units {
        /// Only show one side: ally or enemy
        #[arg(long)]
        side: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "telain_battle=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Battle { file, opts } => commands::battle::run(&file, &opts),
        Commands::Check { file } => commands::check::run(&file),
        Commands::Skirmish {
            allies,
            enemies,
            opts,
        } => commands::skirmish::run(&allies, &enemies, &opts),
        Commands::Units { side } => commands::units::run(side.as_deref()),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "command failed");
        eprintln!("error: {e}");
        process::exit(1);
    }
}
