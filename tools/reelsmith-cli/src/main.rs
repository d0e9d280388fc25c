//! Reelsmith CLI: compose videos from presets.
//!
//! Usage:
//!   reelsmith create <PRESET>          Render one video from a preset
//!   reelsmith batch <PRESET> [FILES]   Render every source clip with a short-form preset
//!   reelsmith presets <ACTION>         List, show, import, or delete presets
//!   reelsmith sources <ACTION>         Enumerate users, clips, and media folders
//!   reelsmith thumbnail <VIDEO>        Extract a cached preview frame
//!   reelsmith check                    Check the encoder engine and preset store

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reelsmith_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "reelsmith",
    about = "Assemble short social videos from clip, image, and music libraries",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/reelsmith/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every random pick, for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one video from a stored preset
    Create {
        /// Preset name
        preset: String,

        /// Number of videos (defaults to the preset's own count)
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Render every source clip with a short-form preset, one at a time
    Batch {
        /// Short-form preset name
        preset: String,

        /// Only clips of this user's subdirectory
        #[arg(short, long)]
        user: Option<String>,

        /// Print progress events as JSON lines
        #[arg(long)]
        json: bool,

        /// Specific clips (names relative to the source directory, or paths)
        files: Vec<PathBuf>,
    },

    /// Manage the preset store
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Enumerate source media
    Sources {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Extract a cached preview frame from a clip
    Thumbnail {
        /// Source clip
        video: PathBuf,

        /// Thumbnail directory (defaults to `thumbnails/` next to the clip)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check the encoder engine and preset store
    Check,
}

#[derive(Subcommand)]
pub enum PresetAction {
    /// List stored presets
    List,

    /// Print one preset as JSON
    Show { name: String },

    /// Delete a preset
    Delete { name: String },

    /// Seed the built-in presets into an empty store
    Init,

    /// Validate a preset JSON file and store it under `name`
    Import { name: String, file: PathBuf },
}

#[derive(Subcommand)]
pub enum SourceAction {
    /// Users with downloaded clips
    Users,

    /// Clips downloaded for one user
    Videos { user: String },

    /// Media folders under the media root
    Folders,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    reelsmith_common::logging::init_logging(&LoggingConfig {
        level,
        json: cli.json_logs || config.logging.json,
        file: config.logging.file.clone(),
    })?;

    match cli.command {
        Commands::Create { preset, count } => {
            commands::create::run(config, cli.seed, preset, count).await
        }
        Commands::Batch {
            preset,
            user,
            json,
            files,
        } => commands::batch::run(config, cli.seed, preset, user, files, json).await,
        Commands::Presets { action } => commands::presets::run(&config, action),
        Commands::Sources { action } => commands::sources::run(&config, action),
        Commands::Thumbnail { video, out } => commands::thumbnail::run(&config, video, out).await,
        Commands::Check => commands::check::run(&config).await,
    }
}
