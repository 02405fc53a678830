//! Destination database sessions.
//!
//! A [`Warehouse`] is the single session a run loads through: positional
//! single-row inserts, the song/artist point lookup that resolves songplays,
//! and a commit after each source file. Transactions open lazily on the first
//! statement after a commit; dropping a session with an open transaction
//! rolls it back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{SongLookup, SongRef, SqlValue, TableRow};
use crate::schema::{ConflictPolicy, Table};

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresWarehouse;
pub use self::sqlite::SqliteWarehouse;

/// Supported destination databases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Network PostgreSQL session
    #[default]
    Postgres,
    /// Local SQLite file
    Sqlite,
}

/// A session against the star schema
#[async_trait]
pub trait Warehouse: Send {
    /// Insert one row given its values in the table's column order
    async fn insert(&mut self, table: Table, values: &[SqlValue]) -> Result<()>;

    /// Find the song and artist ids matching a title, artist name and duration exactly
    async fn find_song(&mut self, lookup: &SongLookup) -> Result<Option<SongRef>>;

    /// Commit everything issued since the last commit
    async fn commit(&mut self) -> Result<()>;

    /// Release the session, discarding uncommitted work
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Insert a typed row through a warehouse
pub async fn load_row<W, R>(warehouse: &mut W, row: &R) -> Result<()>
where
    W: Warehouse + ?Sized,
    R: TableRow + Sync,
{
    warehouse.insert(R::TABLE, &row.values()).await
}

/// Open the session described by the database configuration
pub async fn connect(config: &DatabaseConfig, conflict: ConflictPolicy) -> Result<Box<dyn Warehouse>> {
    match config.backend {
        Backend::Postgres => {
            info!(
                host = %config.host,
                port = config.port,
                dbname = %config.dbname,
                user = %config.user,
                "Connecting to PostgreSQL"
            );
            let warehouse = PostgresWarehouse::connect(config, conflict).await?;
            Ok(Box::new(warehouse))
        },
        Backend::Sqlite => {
            info!(path = %config.sqlite_path, "Opening SQLite database");
            let warehouse = SqliteWarehouse::open(&config.sqlite_path, conflict)?;
            Ok(Box::new(warehouse))
        },
    }
}
