use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection};
use sqlx::query::Query;
use sqlx::{Connection, Postgres, Row};
use tracing::debug;

use super::Warehouse;
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{SongLookup, SongRef, SqlValue};
use crate::schema::{insert_sql, song_select_sql, ConflictPolicy, Placeholder, Table};

/// Star schema session over a single PostgreSQL connection
pub struct PostgresWarehouse {
    conn: PgConnection,
    conflict: ConflictPolicy,
    in_transaction: bool,
}

impl PostgresWarehouse {
    /// Connect with the configured host, database and credentials
    pub async fn connect(config: &DatabaseConfig, conflict: ConflictPolicy) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password);

        let conn = PgConnection::connect_with(&options).await?;

        Ok(Self {
            conn,
            conflict,
            in_transaction: false,
        })
    }

    async fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_transaction {
            sqlx::query("BEGIN").execute(&mut self.conn).await?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

fn bind_value<'q>(query: Query<'q, Postgres, PgArguments>, value: &'q SqlValue) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Text(v) => query.bind(v.as_deref()),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    async fn insert(&mut self, table: Table, values: &[SqlValue]) -> Result<()> {
        self.begin_if_needed().await?;

        let sql = insert_sql(table, Placeholder::Dollar, self.conflict);
        let query = values.iter().fold(sqlx::query(&sql), bind_value);
        query.execute(&mut self.conn).await?;
        Ok(())
    }

    async fn find_song(&mut self, lookup: &SongLookup) -> Result<Option<SongRef>> {
        self.begin_if_needed().await?;

        let sql = song_select_sql(Placeholder::Dollar);
        let row = sqlx::query(&sql)
            .bind(lookup.title.as_str())
            .bind(lookup.artist_name.as_str())
            .bind(lookup.duration)
            .fetch_optional(&mut self.conn)
            .await?;

        match row {
            Some(row) => Ok(Some(SongRef {
                song_id: row.try_get(0)?,
                artist_id: row.try_get(1)?,
            })),
            None => Ok(None),
        }
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            sqlx::query("COMMIT").execute(&mut self.conn).await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        if this.in_transaction {
            debug!("Rolling back uncommitted statements before disconnect");
            sqlx::query("ROLLBACK").execute(&mut this.conn).await?;
        }
        this.conn.close().await?;
        Ok(())
    }
}
