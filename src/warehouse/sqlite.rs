use std::fs;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tracing::debug;

use super::Warehouse;
use crate::error::Result;
use crate::models::{SongLookup, SongRef, SqlValue};
use crate::schema::{insert_sql, song_select_sql, ConflictPolicy, Placeholder, Table};

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(v) => v.to_sql(),
            Self::Integer(v) => v.to_sql(),
            Self::Real(v) => v.to_sql(),
            Self::Timestamp(v) => v.to_sql(),
        }
    }
}

/// Star schema session backed by a SQLite file
pub struct SqliteWarehouse {
    conn: Connection,
    conflict: ConflictPolicy,
    in_transaction: bool,
}

impl SqliteWarehouse {
    /// Open the database file, creating its parent directory if needed
    pub fn open(path: &str, conflict: ConflictPolicy) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn, conflict))
    }

    /// Open a private in-memory database
    pub fn open_in_memory(conflict: ConflictPolicy) -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?, conflict))
    }

    /// Wrap an existing connection
    #[must_use]
    pub const fn from_connection(conn: Connection, conflict: ConflictPolicy) -> Self {
        Self {
            conn,
            conflict,
            in_transaction: false,
        }
    }

    /// Underlying connection, for inspection
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn insert(&mut self, table: Table, values: &[SqlValue]) -> Result<()> {
        self.begin_if_needed()?;

        let sql = insert_sql(table, Placeholder::Question, self.conflict);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(rusqlite::params_from_iter(values.iter()))?;
        Ok(())
    }

    async fn find_song(&mut self, lookup: &SongLookup) -> Result<Option<SongRef>> {
        self.begin_if_needed()?;

        let mut stmt = self.conn.prepare_cached(&song_select_sql(Placeholder::Question))?;
        let found = stmt
            .query_row(params![lookup.title, lookup.artist_name, lookup.duration], |row| {
                Ok(SongRef {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })
            .optional()?;

        Ok(found)
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        if this.in_transaction {
            debug!("Closing SQLite session with uncommitted statements");
        }
        this.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}
