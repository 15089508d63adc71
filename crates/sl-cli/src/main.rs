//! CLI frontend for Storyloom.

mod commands;
mod watch;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "loom",
    about = "Storyloom: compile branching stories and play them while you write",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to loom.toml (default: nearest one above the story directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every story root and report diagnostics
    Build {
        /// Directory containing .tale files (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Write one JSON unit per root into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Validate story roots without writing output
    Check {
        /// Directory containing .tale files (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show which roots include which documents
    Deps {
        /// Directory containing .tale files (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Only list the roots a change to this file would rebuild
        #[arg(long)]
        changed: Option<PathBuf>,
    },

    /// Play a story in the terminal
    Play {
        /// Root script to play
        root: PathBuf,

        /// Rebuild on file changes and keep the player's place
        #[arg(short, long)]
        watch: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Build { dir, out } => commands::build::run(config, &dir, out.as_deref()),
        Commands::Check { dir } => commands::check::run(config, &dir),
        Commands::Deps { dir, changed } => commands::deps::run(config, &dir, changed.as_deref()),
        Commands::Play { root, watch } => commands::play::run(config, &root, watch),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
