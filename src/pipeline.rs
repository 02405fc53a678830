//! File-set processing and the run driver.
//!
//! A run walks the song metadata root, then the activity log root, loading
//! one file at a time and committing after each. The song root always
//! finishes first because songplay resolution reads the songs and artists it
//! loaded.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::AppConfig;
use crate::error::Result;
use crate::extract;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{SongLookup, SongRef, TableRow};
use crate::schema::Table;
use crate::warehouse::{self, load_row, Warehouse};

/// The kind of files under a source root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Song metadata, one song and artist per file
    Song,
    /// Activity logs, many events per file
    Log,
}

impl SourceKind {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Song => "song_data",
            Self::Log => "log_data",
        }
    }
}

/// Counts gathered over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Song metadata files committed
    pub song_files: usize,
    /// Log files committed
    pub log_files: usize,
    /// Rows inserted into songs
    pub songs: usize,
    /// Rows inserted into artists
    pub artists: usize,
    /// Rows inserted into time
    pub time_rows: usize,
    /// Rows inserted into users
    pub users: usize,
    /// Rows inserted into songplays
    pub songplays: usize,
    /// Songplays whose song and artist were found
    pub resolved: usize,
    /// Songplays stored with null song and artist
    pub unresolved: usize,
    /// Log events dropped for not being plays
    pub discarded_events: usize,
}

impl RunSummary {
    fn record_insert(&mut self, table: Table) {
        match table {
            Table::Songs => self.songs += 1,
            Table::Artists => self.artists += 1,
            Table::Time => self.time_rows += 1,
            Table::Users => self.users += 1,
            Table::Songplays => self.songplays += 1,
        }
    }

    fn record_file(&mut self, kind: SourceKind) {
        match kind {
            SourceKind::Song => self.song_files += 1,
            SourceKind::Log => self.log_files += 1,
        }
    }
}

/// Every `.json` file under `root`, recursively, sorted by path
///
/// Symbolic links are followed, so linked files and directories are loaded
/// like regular ones.
pub fn collect_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Loads source files through one warehouse session
pub struct Pipeline<'w, W: Warehouse + ?Sized> {
    warehouse: &'w mut W,
    metrics: MetricsCollector,
    summary: RunSummary,
}

impl<'w, W: Warehouse + ?Sized> Pipeline<'w, W> {
    /// Start a pipeline over an open session
    pub fn new(warehouse: &'w mut W) -> Self {
        Self {
            warehouse,
            metrics: MetricsCollector,
            summary: RunSummary::default(),
        }
    }

    /// Counts so far
    #[must_use]
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Finish and return the counts
    #[must_use]
    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    /// Load every file under `root`, committing after each one
    ///
    /// The first failing file aborts the walk; files before it stay committed.
    pub async fn process_data(&mut self, root: &Path, kind: SourceKind) -> Result<()> {
        let files = collect_json_files(root)?;
        let total = files.len();
        info!("{} files found in {}", total, root.display());

        for (i, path) in files.iter().enumerate() {
            let timer = OperationTimer::new(&format!("load {}", path.display()));

            if let Err(e) = self.process_file(path, kind).await {
                warn!(file = %path.display(), "Failed to load {}: {}", kind.label(), e);
                self.metrics.record_error(kind.label());
                return Err(e);
            }
            self.warehouse.commit().await?;

            self.summary.record_file(kind);
            self.metrics.record_file(kind.label(), timer.finish());
            info!("{}/{} files processed.", i + 1, total);
        }

        Ok(())
    }

    /// Extract and load one file without committing
    pub async fn process_file(&mut self, path: &Path, kind: SourceKind) -> Result<()> {
        match kind {
            SourceKind::Song => self.process_song_file(path).await,
            SourceKind::Log => self.process_log_file(path).await,
        }
    }

    /// Insert the song and artist described by one metadata file
    pub async fn process_song_file(&mut self, path: &Path) -> Result<()> {
        let file = extract::read_song_file(path)?;

        self.load(&file.song).await?;
        self.load(&file.artist).await?;
        Ok(())
    }

    /// Insert time, user and songplay rows for the plays in one log file
    pub async fn process_log_file(&mut self, path: &Path) -> Result<()> {
        let log = extract::read_log_file(path)?;
        self.summary.discarded_events += log.discarded;

        if log.is_empty() {
            debug!("No plays in {}", path.display());
            return Ok(());
        }

        for row in log.time_rows() {
            self.load(&row).await?;
        }

        for row in log.user_rows() {
            self.load(&row).await?;
        }

        for play in &log.plays {
            let resolved = self.resolve(&play.lookup).await?;
            self.load(&play.songplay_row(resolved)).await?;
        }

        Ok(())
    }

    /// Look up the song and artist ids for a play
    pub async fn resolve(&mut self, lookup: &SongLookup) -> Result<Option<SongRef>> {
        let found = self.warehouse.find_song(lookup).await?;

        self.metrics.record_lookup(found.is_some());
        if found.is_some() {
            self.summary.resolved += 1;
        } else {
            self.summary.unresolved += 1;
            debug!(title = %lookup.title, artist = %lookup.artist_name, "No song match");
        }

        Ok(found)
    }

    async fn load<R: TableRow + Sync>(&mut self, row: &R) -> Result<()> {
        load_row(&mut *self.warehouse, row).await?;
        self.summary.record_insert(R::TABLE);
        self.metrics.record_insert(R::TABLE);
        Ok(())
    }
}

/// Load both source roots through an already open session
pub async fn run_with<W: Warehouse + ?Sized>(warehouse: &mut W, song_root: &Path, log_root: &Path) -> Result<RunSummary> {
    let mut pipeline = Pipeline::new(warehouse);

    pipeline.process_data(song_root, SourceKind::Song).await?;
    pipeline.process_data(log_root, SourceKind::Log).await?;

    let summary = pipeline.into_summary();
    info!(
        songs = summary.songs,
        artists = summary.artists,
        time_rows = summary.time_rows,
        users = summary.users,
        songplays = summary.songplays,
        resolved = summary.resolved,
        unresolved = summary.unresolved,
        "Load complete"
    );
    Ok(summary)
}

/// Open the configured session, load both source roots, then close it
pub async fn run(config: &AppConfig) -> Result<RunSummary> {
    let mut warehouse = warehouse::connect(&config.database, config.pipeline.on_conflict).await?;

    let result = run_with(
        warehouse.as_mut(),
        Path::new(&config.pipeline.song_data_dir),
        Path::new(&config.pipeline.log_data_dir),
    )
    .await;

    match result {
        Ok(summary) => {
            warehouse.close().await?;
            Ok(summary)
        },
        Err(e) => {
            if let Err(close_err) = warehouse.close().await {
                warn!("Failed to close session after error: {}", close_err);
            }
            Err(e)
        },
    }
}
