use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "posterforge")]
#[command(author, version, about = "Stamp rating badges onto Plex movie posters")]
pub struct Cli {
    /// Directory holding config.yaml and its env overlays
    #[arg(short = 'd', long, global = true, default_value = "./config")]
    pub config_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every configured library once
    Run {
        /// Abort on the first library failure
        #[arg(long)]
        strict: bool,
    },

    /// Load and validate the configuration
    Validate,

    /// Show version information
    Version,
}
