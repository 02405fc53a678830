use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sparkify_etl::config::AppConfig;
use sparkify_etl::logging::init_logging;
use sparkify_etl::models::SongLookup;
use sparkify_etl::schema::ConflictPolicy;
use sparkify_etl::warehouse;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over config/default and config/local
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load song metadata and activity logs into the star schema
    Load {
        /// Root directory of song metadata files
        #[arg(long)]
        song_data: Option<String>,

        /// Root directory of activity log files
        #[arg(long)]
        log_data: Option<String>,

        /// What to do with an already loaded song or artist (fail or ignore)
        #[arg(long)]
        on_conflict: Option<ConflictPolicy>,
    },
    /// Look up the song and artist ids a play would resolve to
    Resolve {
        /// Song title
        #[arg(short, long)]
        title: String,

        /// Artist name
        #[arg(short, long)]
        artist: String,

        /// Song length in seconds
        #[arg(short, long)]
        duration: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    let log_level = config.get_log_level();
    let log_file = config.logging.file_path.as_ref().map(PathBuf::from);
    let _log_guard = init_logging(Some(log_level.as_str()), log_file.as_deref(), &config.logging.format)?;

    info!("Starting sparkify-etl");

    match cli.command {
        Commands::Load {
            song_data,
            log_data,
            on_conflict,
        } => {
            if let Some(dir) = song_data {
                config.pipeline.song_data_dir = dir;
            }
            if let Some(dir) = log_data {
                config.pipeline.log_data_dir = dir;
            }
            if let Some(policy) = on_conflict {
                config.pipeline.on_conflict = policy;
            }
            config.validate()?;

            let summary = sparkify_etl::run(&config).await.context("Load failed")?;
            info!(
                "Loaded {} song files and {} log files ({} songplays, {} resolved)",
                summary.song_files, summary.log_files, summary.songplays, summary.resolved
            );
        },
        Commands::Resolve { title, artist, duration } => {
            config.validate()?;

            let lookup = SongLookup {
                title,
                artist_name: artist,
                duration,
            };
            resolve(&config, &lookup).await?;
        },
    }

    Ok(())
}

/// Run a single song lookup against the configured database
async fn resolve(config: &AppConfig, lookup: &SongLookup) -> Result<()> {
    let mut session = warehouse::connect(&config.database, config.pipeline.on_conflict)
        .await
        .context("Failed to open database session")?;

    let found = session.find_song(lookup).await?;
    match &found {
        Some(song) => info!(song_id = %song.song_id, artist_id = %song.artist_id, "Match found"),
        None => info!(title = %lookup.title, artist = %lookup.artist_name, duration = lookup.duration, "No match"),
    }

    session.close().await?;
    Ok(())
}
