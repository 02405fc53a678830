//! Record extraction for song metadata and activity log files.
//!
//! Both file kinds are read whole and decoded with a streaming JSON
//! deserializer, so line-delimited records and a single pretty-printed record
//! are accepted alike.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::models::{ArtistRow, LogEvent, PlayEvent, SongLookup, SongRecord, SongRow, TimeRow, UserRow};

/// Rows produced by one song metadata file
#[derive(Debug, Clone, PartialEq)]
pub struct SongFile {
    /// Row for the songs table
    pub song: SongRow,
    /// Row for the artists table
    pub artist: ArtistRow,
}

/// Read a song metadata file into its song and artist rows
pub fn read_song_file(path: &Path) -> Result<SongFile> {
    let text = fs::read_to_string(path)?;
    parse_song_file(path, &text)
}

/// Parse the contents of a song metadata file
///
/// Only the first record is used.
pub fn parse_song_file(path: &Path, text: &str) -> Result<SongFile> {
    let mut records = serde_json::Deserializer::from_str(text).into_iter::<SongRecord>();

    let record = records
        .next()
        .ok_or_else(|| EtlError::EmptySongFile(path.to_path_buf()))?
        .map_err(|source| json_error(path, source))?;

    // Later records only need to be well-formed JSON
    let rest = &text[records.byte_offset()..];
    let extra = decode_records::<IgnoredAny>(path, rest).try_fold(0usize, |n, r| r.map(|_| n + 1))?;
    if extra > 0 {
        debug!("Ignoring {} additional records in {}", extra, path.display());
    }

    Ok(SongFile {
        song: record.song_row(),
        artist: record.artist_row(),
    })
}

/// Song plays extracted from one activity log file
#[derive(Debug, Clone, Default)]
pub struct LogFile {
    /// Plays in file order
    pub plays: Vec<PlayEvent>,
    /// Number of non-play events dropped
    pub discarded: usize,
}

impl LogFile {
    /// Time rows, one per play in file order
    pub fn time_rows(&self) -> impl Iterator<Item = TimeRow> + '_ {
        self.plays.iter().map(PlayEvent::time_row)
    }

    /// User rows, one per play in file order
    pub fn user_rows(&self) -> impl Iterator<Item = UserRow> + '_ {
        self.plays.iter().map(PlayEvent::user_row)
    }

    /// Whether the file contained no plays
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }
}

/// Read an activity log file and keep its song plays
pub fn read_log_file(path: &Path) -> Result<LogFile> {
    let text = fs::read_to_string(path)?;
    parse_log_file(path, &text)
}

/// Parse the contents of an activity log file
pub fn parse_log_file(path: &Path, text: &str) -> Result<LogFile> {
    let mut log = LogFile::default();

    for (index, event) in decode_records::<LogEvent>(path, text).enumerate() {
        let event = event?;
        if event.is_play() {
            log.plays.push(to_play(path, index, event)?);
        } else {
            log.discarded += 1;
        }
    }

    Ok(log)
}

/// Convert epoch milliseconds to a UTC timestamp
pub fn timestamp_from_millis(ts: i64) -> Result<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.naive_utc())
        .ok_or(EtlError::InvalidTimestamp(ts))
}

fn to_play(path: &Path, index: usize, event: LogEvent) -> Result<PlayEvent> {
    let missing = |field: &'static str| EtlError::MissingField {
        path: path.to_path_buf(),
        index,
        field,
    };

    Ok(PlayEvent {
        start_time: timestamp_from_millis(event.ts)?,
        user_id: event.user_id.ok_or_else(|| missing("userId"))?,
        first_name: event.first_name,
        last_name: event.last_name,
        gender: event.gender,
        level: event.level.ok_or_else(|| missing("level"))?,
        lookup: SongLookup {
            title: event.song.ok_or_else(|| missing("song"))?,
            artist_name: event.artist.ok_or_else(|| missing("artist"))?,
            duration: event.length.ok_or_else(|| missing("length"))?,
        },
        session_id: event.session_id.ok_or_else(|| missing("sessionId"))?,
        location: event.location,
        user_agent: event.user_agent,
    })
}

fn decode_records<'a, T>(path: &'a Path, text: &'a str) -> impl Iterator<Item = Result<T>> + 'a
where
    T: DeserializeOwned + 'a,
{
    serde_json::Deserializer::from_str(text)
        .into_iter::<T>()
        .map(move |record| record.map_err(|source| json_error(path, source)))
}

fn json_error(path: &Path, source: serde_json::Error) -> EtlError {
    EtlError::Json {
        path: path.to_path_buf(),
        source,
    }
}
