//! Loads against a live PostgreSQL database
//!
//! These tests drop and recreate the star schema tables, so point them at a
//! scratch database:
//!
//! ```sh
//! SPARKIFY_DATABASE__HOST=127.0.0.1 SPARKIFY_DATABASE__DBNAME=sparkify_test \
//! SPARKIFY_DATABASE__USER=student SPARKIFY_DATABASE__PASSWORD=student \
//! cargo test --test postgres_test -- --ignored --test-threads=1
//! ```

mod common;

use common::{next_song, song_record, write_records};
use sparkify_etl::config::{AppConfig, DatabaseConfig};
use sparkify_etl::models::{SongLookup, SongRecord};
use sparkify_etl::schema::ConflictPolicy;
use sparkify_etl::warehouse::{self, load_row, Backend, Warehouse};
use sparkify_etl::{run, EtlError};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Row};

const SCHEMA: &str = include_str!("../sql/schema_postgres.sql");

fn env_config() -> AppConfig {
    let config = AppConfig::load_from(None).unwrap();
    assert_eq!(config.database.backend, Backend::Postgres);
    config
}

async fn raw_connection(config: &DatabaseConfig) -> PgConnection {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.dbname)
        .username(&config.user)
        .password(&config.password);
    PgConnection::connect_with(&options).await.unwrap()
}

/// Recreate empty star schema tables
async fn reset_schema(config: &DatabaseConfig) -> PgConnection {
    let mut conn = raw_connection(config).await;
    sqlx::raw_sql("DROP TABLE IF EXISTS songplays, users, time, artists, songs")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::raw_sql(SCHEMA).execute(&mut conn).await.unwrap();
    conn
}

async fn count(conn: &mut PgConnection, table: &str) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *conn)
        .await
        .unwrap()
        .get(0)
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database from SPARKIFY_DATABASE__* variables"]
async fn test_song_and_log_scenarios() {
    let mut config = env_config();
    let mut conn = reset_schema(&config.database).await;

    let dir = tempfile::tempdir().unwrap();
    let song_root = dir.path().join("song_data");
    let log_root = dir.path().join("log_data");
    write_records(&song_root.join("A/TRAAA.json"), &[song_record("S1", "T", "A1", "N", 123.45)]);
    write_records(
        &log_root.join("2018/11/events.json"),
        &[
            next_song(1_541_990_258_796, "39", "T", "N", 123.45),
            next_song(1_541_990_300_000, "39", "Unknown", "N", 123.45),
        ],
    );
    config.pipeline.song_data_dir = song_root.to_string_lossy().into_owned();
    config.pipeline.log_data_dir = log_root.to_string_lossy().into_owned();

    let summary = run(&config).await.unwrap();
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.unresolved, 1);

    let song = sqlx::query("SELECT song_id, title, artist_id, year, duration FROM songs")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(song.get::<String, _>(0), "S1");
    assert_eq!(song.get::<String, _>(1), "T");
    assert_eq!(song.get::<String, _>(2), "A1");
    assert_eq!(song.get::<i32, _>(3), 2000);
    assert_eq!(song.get::<f64, _>(4), 123.45);

    let artist = sqlx::query("SELECT name, location, latitude, longitude FROM artists WHERE artist_id = 'A1'")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(artist.get::<String, _>(0), "N");
    assert_eq!(artist.get::<Option<String>, _>(1).as_deref(), Some("L"));
    assert_eq!(artist.get::<Option<f64>, _>(2), Some(1.0));
    assert_eq!(artist.get::<Option<f64>, _>(3), Some(2.0));

    let plays = sqlx::query("SELECT song_id, artist_id, session_id, start_time FROM songplays ORDER BY songplay_id")
        .fetch_all(&mut conn)
        .await
        .unwrap();
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[0].get::<Option<String>, _>(0).as_deref(), Some("S1"));
    assert_eq!(plays[0].get::<Option<String>, _>(1).as_deref(), Some("A1"));
    assert_eq!(plays[0].get::<i32, _>(2), 38);
    assert_eq!(
        plays[0].get::<chrono::NaiveDateTime, _>(3).to_string(),
        "2018-11-12 02:37:38.796"
    );
    assert_eq!(plays[1].get::<Option<String>, _>(0), None);
    assert_eq!(plays[1].get::<Option<String>, _>(1), None);

    let time = sqlx::query("SELECT hour, day, week, month, year, weekday FROM time ORDER BY start_time LIMIT 1")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    let fields: Vec<i32> = (0..6).map(|i| time.get::<i32, _>(i)).collect();
    assert_eq!(fields, vec![2, 12, 46, 11, 2018, 0]);

    assert_eq!(count(&mut conn, "users").await, 2);

    // A second strict run stops on the first song
    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, EtlError::Postgres(_)), "{err}");
    assert_eq!(count(&mut conn, "songs").await, 1);
    assert_eq!(count(&mut conn, "songplays").await, 2);
}

#[tokio::test]
#[ignore = "needs a PostgreSQL database from SPARKIFY_DATABASE__* variables"]
async fn test_ignore_policy_and_rollback_on_close() {
    let config = env_config();
    let mut conn = reset_schema(&config.database).await;

    let mut session = warehouse::connect(&config.database, ConflictPolicy::Ignore).await.unwrap();
    let record = serde_json::from_value::<SongRecord>(song_record("S1", "T", "A1", "N", 1.5)).unwrap();
    load_row(session.as_mut(), &record.song_row()).await.unwrap();
    load_row(session.as_mut(), &record.artist_row()).await.unwrap();
    load_row(session.as_mut(), &record.song_row()).await.unwrap();
    session.commit().await.unwrap();

    let lookup = SongLookup {
        title: "T".to_string(),
        artist_name: "N".to_string(),
        duration: 1.5,
    };
    let found = session.find_song(&lookup).await.unwrap().unwrap();
    assert_eq!((found.song_id.as_str(), found.artist_id.as_str()), ("S1", "A1"));

    let other = serde_json::from_value::<SongRecord>(song_record("S2", "T2", "A2", "M", 2.5)).unwrap();
    load_row(session.as_mut(), &other.song_row()).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(count(&mut conn, "songs").await, 1);
    assert_eq!(count(&mut conn, "artists").await, 1);
}
