use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate SEO metadata for every matched media/transcript pair
    Run {
        /// Directory containing media files
        #[arg(long)]
        media_dir: Option<PathBuf>,

        /// Directory containing transcript files
        #[arg(long)]
        transcript_dir: Option<PathBuf>,

        /// Directory for results and reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// API key (overrides the environment variable)
        #[arg(long)]
        api_key: Option<String>,

        /// Model to use for generation
        #[arg(short, long)]
        model: Option<String>,

        /// Process at most this many items
        #[arg(long)]
        max_items: Option<usize>,

        /// Regenerate items that already have results
        #[arg(long)]
        force_reprocess: bool,

        /// Regenerate items whose stored results have empty fields
        #[arg(long)]
        reprocess_degraded: bool,

        /// Save intermediate results every N processed items
        #[arg(long)]
        checkpoint_interval: Option<usize>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Check credential and input directories without calling the API
    Check {
        /// API key (overrides the environment variable)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "seogen.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
