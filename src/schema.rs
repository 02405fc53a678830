//! Star schema table definitions
//!
//! This module provides constants for table and column names and builds the
//! positional insert statements the loaders bind against. Column order here is
//! the binding order for every row type in [`crate::models`].

use serde::{Deserialize, Serialize};

/// Songs dimension schema
pub mod songs {
    /// Table name
    pub const TABLE: &str = "songs";
    /// Natural key column
    pub const SONG_ID: &str = "song_id";
    /// Song title column
    pub const TITLE: &str = "title";
    /// Foreign key to artists table
    pub const ARTIST_ID: &str = "artist_id";
    /// Release year column (0 when unknown)
    pub const YEAR: &str = "year";
    /// Duration in seconds column
    pub const DURATION: &str = "duration";
    /// Insert column order
    pub const COLUMNS: &[&str] = &[SONG_ID, TITLE, ARTIST_ID, YEAR, DURATION];
}

/// Artists dimension schema
pub mod artists {
    /// Table name
    pub const TABLE: &str = "artists";
    /// Natural key column
    pub const ARTIST_ID: &str = "artist_id";
    /// Artist name column
    pub const NAME: &str = "name";
    /// Free-text location column
    pub const LOCATION: &str = "location";
    /// Latitude column
    pub const LATITUDE: &str = "latitude";
    /// Longitude column
    pub const LONGITUDE: &str = "longitude";
    /// Insert column order
    pub const COLUMNS: &[&str] = &[ARTIST_ID, NAME, LOCATION, LATITUDE, LONGITUDE];
}

/// Time dimension schema
pub mod time {
    /// Table name
    pub const TABLE: &str = "time";
    /// Play timestamp column
    pub const START_TIME: &str = "start_time";
    /// Hour of day column
    pub const HOUR: &str = "hour";
    /// Day of month column
    pub const DAY: &str = "day";
    /// ISO week number column
    pub const WEEK: &str = "week";
    /// Month column
    pub const MONTH: &str = "month";
    /// Year column
    pub const YEAR: &str = "year";
    /// Day of week column, Monday = 0
    pub const WEEKDAY: &str = "weekday";
    /// Insert column order
    pub const COLUMNS: &[&str] = &[START_TIME, HOUR, DAY, WEEK, MONTH, YEAR, WEEKDAY];
}

/// Users dimension schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// User identifier column
    pub const USER_ID: &str = "user_id";
    /// First name column
    pub const FIRST_NAME: &str = "first_name";
    /// Last name column
    pub const LAST_NAME: &str = "last_name";
    /// Gender column
    pub const GENDER: &str = "gender";
    /// Subscription tier column
    pub const LEVEL: &str = "level";
    /// Insert column order
    pub const COLUMNS: &[&str] = &[USER_ID, FIRST_NAME, LAST_NAME, GENDER, LEVEL];
}

/// Songplays fact schema
pub mod songplays {
    /// Table name
    pub const TABLE: &str = "songplays";
    /// Surrogate key column, generated by the database
    pub const SONGPLAY_ID: &str = "songplay_id";
    /// Play timestamp column
    pub const START_TIME: &str = "start_time";
    /// User identifier column
    pub const USER_ID: &str = "user_id";
    /// Subscription tier at play time column
    pub const LEVEL: &str = "level";
    /// Resolved song column (nullable)
    pub const SONG_ID: &str = "song_id";
    /// Resolved artist column (nullable)
    pub const ARTIST_ID: &str = "artist_id";
    /// Listening session column
    pub const SESSION_ID: &str = "session_id";
    /// Client location column
    pub const LOCATION: &str = "location";
    /// Client user agent column
    pub const USER_AGENT: &str = "user_agent";
    /// Insert column order
    pub const COLUMNS: &[&str] = &[
        START_TIME, USER_ID, LEVEL, SONG_ID, ARTIST_ID, SESSION_ID, LOCATION, USER_AGENT,
    ];
}

/// Destination table identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `songs`
    Songs,
    /// `artists`
    Artists,
    /// `time`
    Time,
    /// `users`
    Users,
    /// `songplays`
    Songplays,
}

impl Table {
    /// SQL table name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Songs => songs::TABLE,
            Self::Artists => artists::TABLE,
            Self::Time => time::TABLE,
            Self::Users => users::TABLE,
            Self::Songplays => songplays::TABLE,
        }
    }

    /// Columns bound by an insert, in order
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Songs => songs::COLUMNS,
            Self::Artists => artists::COLUMNS,
            Self::Time => time::COLUMNS,
            Self::Users => users::COLUMNS,
            Self::Songplays => songplays::COLUMNS,
        }
    }

    /// Whether the table is keyed by a natural key the source may repeat
    #[must_use]
    pub const fn has_natural_key(self) -> bool {
        matches!(self, Self::Songs | Self::Artists)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do when a song or artist natural key is already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Let the primary key violation abort the run
    #[default]
    Fail,
    /// Skip the row with `ON CONFLICT DO NOTHING`
    Ignore,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("unknown conflict policy: {other} (expected fail or ignore)")),
        }
    }
}

/// Bind parameter syntax of the target database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?1, ?2, ...` (SQLite)
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    Dollar,
}

impl Placeholder {
    fn render(self, index: usize) -> String {
        match self {
            Self::Question => format!("?{index}"),
            Self::Dollar => format!("${index}"),
        }
    }
}

/// Build the single-row insert statement for a table
#[must_use]
pub fn insert_sql(table: Table, placeholder: Placeholder, conflict: ConflictPolicy) -> String {
    let columns = table.columns();
    let params = (1..=columns.len())
        .map(|i| placeholder.render(i))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("INSERT INTO {} ({}) VALUES ({})", table.name(), columns.join(", "), params);
    if conflict == ConflictPolicy::Ignore && table.has_natural_key() {
        sql.push_str(" ON CONFLICT DO NOTHING");
    }
    sql
}

/// Build the song/artist lookup used to resolve songplays
#[must_use]
pub fn song_select_sql(placeholder: Placeholder) -> String {
    format!(
        "SELECT s.{}, a.{} FROM {} s JOIN {} a ON s.{} = a.{} WHERE s.{} = {} AND a.{} = {} AND s.{} = {} LIMIT 1",
        songs::SONG_ID,
        artists::ARTIST_ID,
        songs::TABLE,
        artists::TABLE,
        songs::ARTIST_ID,
        artists::ARTIST_ID,
        songs::TITLE,
        placeholder.render(1),
        artists::NAME,
        placeholder.render(2),
        songs::DURATION,
        placeholder.render(3),
    )
}
