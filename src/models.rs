//! Data models for source records and destination rows
//!
//! Source records mirror the JSON files field for field. Rows are the
//! normalized tuples inserted into the star schema; each row type knows its
//! destination table and produces its values in column order.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer};

use crate::schema::Table;

/// A record from a song metadata file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongRecord {
    /// Song natural key
    pub song_id: String,
    /// Song title
    pub title: String,
    /// Artist natural key
    pub artist_id: String,
    /// Release year, absent or null when unknown
    #[serde(default)]
    pub year: Option<i32>,
    /// Duration in seconds
    pub duration: f64,
    /// Artist display name
    pub artist_name: String,
    /// Artist location, free text
    #[serde(default)]
    pub artist_location: Option<String>,
    /// Artist latitude
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    /// Artist longitude
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

impl SongRecord {
    /// Row for the songs table
    #[must_use]
    pub fn song_row(&self) -> SongRow {
        SongRow {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year.unwrap_or(0),
            duration: self.duration,
        }
    }

    /// Row for the artists table
    #[must_use]
    pub fn artist_row(&self) -> ArtistRow {
        ArtistRow {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

/// An event from a user activity log file
///
/// Only `page` and `ts` are present on every event; logged-out and
/// navigation events omit most of the user and song fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Page action, `NextSong` for a play
    pub page: String,
    /// Event time in epoch milliseconds
    pub ts: i64,
    /// User identifier, a string in most logs but occasionally numeric
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    /// First name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Gender
    #[serde(default)]
    pub gender: Option<String>,
    /// Subscription tier, `free` or `paid`
    #[serde(default)]
    pub level: Option<String>,
    /// Song title as reported by the client
    #[serde(default)]
    pub song: Option<String>,
    /// Artist name as reported by the client
    #[serde(default)]
    pub artist: Option<String>,
    /// Song length in seconds
    #[serde(default)]
    pub length: Option<f64>,
    /// Listening session identifier
    #[serde(default)]
    pub session_id: Option<i64>,
    /// Client location
    #[serde(default)]
    pub location: Option<String>,
    /// Client user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Page value marking a song play
pub const NEXT_SONG: &str = "NextSong";

impl LogEvent {
    /// Whether this event is a song play
    #[must_use]
    pub fn is_play(&self) -> bool {
        self.page == NEXT_SONG
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    }))
}

/// A song play with every field the fact and dimension rows require
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    /// Play timestamp (UTC)
    pub start_time: NaiveDateTime,
    /// User identifier
    pub user_id: String,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Subscription tier
    pub level: String,
    /// Key used to resolve song and artist ids
    pub lookup: SongLookup,
    /// Listening session identifier
    pub session_id: i64,
    /// Location
    pub location: Option<String>,
    /// Client user agent
    pub user_agent: Option<String>,
}

impl PlayEvent {
    /// Row for the time table
    #[must_use]
    pub fn time_row(&self) -> TimeRow {
        TimeRow::from_start_time(self.start_time)
    }

    /// Row for the users table
    #[must_use]
    pub fn user_row(&self) -> UserRow {
        UserRow {
            user_id: self.user_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: self.level.clone(),
        }
    }

    /// Row for the songplays table, given the resolver outcome
    #[must_use]
    pub fn songplay_row(&self, resolved: Option<SongRef>) -> SongplayRow {
        let (song_id, artist_id) = match resolved {
            Some(r) => (Some(r.song_id), Some(r.artist_id)),
            None => (None, None),
        };

        SongplayRow {
            start_time: self.start_time,
            user_id: self.user_id.clone(),
            level: self.level.clone(),
            song_id,
            artist_id,
            session_id: self.session_id,
            location: self.location.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Natural key used to find a song and its artist
#[derive(Debug, Clone, PartialEq)]
pub struct SongLookup {
    /// Song title, matched exactly
    pub title: String,
    /// Artist name, matched exactly
    pub artist_name: String,
    /// Duration in seconds, matched exactly
    pub duration: f64,
}

/// Identifiers of a resolved song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRef {
    /// Song natural key
    pub song_id: String,
    /// Artist natural key
    pub artist_id: String,
}

/// A bindable column value
///
/// Nulls carry their column type so typed backends bind them correctly.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Text value
    Text(Option<String>),
    /// Integer value
    Integer(Option<i64>),
    /// Floating point value
    Real(Option<f64>),
    /// Date/time value
    Timestamp(NaiveDateTime),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(Some(v))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(Some(v))
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Integer(Some(i64::from(v)))
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        Self::Integer(Some(i64::from(v)))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(Some(v))
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(v: Option<f64>) -> Self {
        Self::Real(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

/// A row bound positionally into its destination table
pub trait TableRow {
    /// Destination table
    const TABLE: Table;

    /// Values in the table's insert column order
    fn values(&self) -> Vec<SqlValue>;
}

/// Songs table row
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    /// Song natural key
    pub song_id: String,
    /// Song title
    pub title: String,
    /// Artist natural key
    pub artist_id: String,
    /// Release year, 0 when unknown
    pub year: i32,
    /// Duration in seconds
    pub duration: f64,
}

impl TableRow for SongRow {
    const TABLE: Table = Table::Songs;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.song_id.clone().into(),
            self.title.clone().into(),
            self.artist_id.clone().into(),
            self.year.into(),
            self.duration.into(),
        ]
    }
}

/// Artists table row
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    /// Artist natural key
    pub artist_id: String,
    /// Artist name
    pub name: String,
    /// Location
    pub location: Option<String>,
    /// Latitude
    pub latitude: Option<f64>,
    /// Longitude
    pub longitude: Option<f64>,
}

impl TableRow for ArtistRow {
    const TABLE: Table = Table::Artists;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.artist_id.clone().into(),
            self.name.clone().into(),
            self.location.clone().into(),
            self.latitude.into(),
            self.longitude.into(),
        ]
    }
}

/// Time table row, a calendar decomposition of one play timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRow {
    /// Play timestamp (UTC)
    pub start_time: NaiveDateTime,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of month, 1-31
    pub day: u32,
    /// ISO 8601 week number, 1-53
    pub week: u32,
    /// Month, 1-12
    pub month: u32,
    /// Calendar year
    pub year: i32,
    /// Day of week, Monday = 0 through Sunday = 6
    pub weekday: u32,
}

impl TimeRow {
    /// Decompose a timestamp into its calendar fields
    #[must_use]
    pub fn from_start_time(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            hour: start_time.hour(),
            day: start_time.day(),
            week: start_time.iso_week().week(),
            month: start_time.month(),
            year: start_time.year(),
            weekday: start_time.weekday().num_days_from_monday(),
        }
    }
}

impl TableRow for TimeRow {
    const TABLE: Table = Table::Time;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.start_time.into(),
            self.hour.into(),
            self.day.into(),
            self.week.into(),
            self.month.into(),
            self.year.into(),
            self.weekday.into(),
        ]
    }
}

/// Users table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    /// User identifier
    pub user_id: String,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Subscription tier
    pub level: String,
}

impl TableRow for UserRow {
    const TABLE: Table = Table::Users;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.user_id.clone().into(),
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.gender.clone().into(),
            self.level.clone().into(),
        ]
    }
}

/// Songplays table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongplayRow {
    /// Play timestamp (UTC)
    pub start_time: NaiveDateTime,
    /// User identifier
    pub user_id: String,
    /// Subscription tier
    pub level: String,
    /// Resolved song, null when the lookup missed
    pub song_id: Option<String>,
    /// Resolved artist, null when the lookup missed
    pub artist_id: Option<String>,
    /// Listening session identifier
    pub session_id: i64,
    /// Location
    pub location: Option<String>,
    /// Client user agent
    pub user_agent: Option<String>,
}

impl TableRow for SongplayRow {
    const TABLE: Table = Table::Songplays;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.start_time.into(),
            self.user_id.clone().into(),
            self.level.clone().into(),
            self.song_id.clone().into(),
            self.artist_id.clone().into(),
            self.session_id.into(),
            self.location.clone().into(),
            self.user_agent.clone().into(),
        ]
    }
}
