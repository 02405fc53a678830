#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use sparkify_etl::schema::ConflictPolicy;
use sparkify_etl::SqliteWarehouse;

pub const SCHEMA: &str = include_str!("../fixtures/schema_sqlite.sql");

/// In-memory warehouse with the star schema created
pub fn warehouse(conflict: ConflictPolicy) -> SqliteWarehouse {
    let wh = SqliteWarehouse::open_in_memory(conflict).unwrap();
    wh.connection().execute_batch(SCHEMA).unwrap();
    wh
}

pub fn count(wh: &SqliteWarehouse, table: &str) -> i64 {
    wh.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

pub fn song_record(song_id: &str, title: &str, artist_id: &str, artist_name: &str, duration: f64) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": 1.0,
        "artist_longitude": 2.0,
        "artist_location": "L",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": 2000
    })
}

pub fn next_song(ts: i64, user_id: &str, song: &str, artist: &str, length: f64) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": "Walter",
        "gender": "M",
        "itemInSession": 0,
        "lastName": "Frye",
        "length": length,
        "level": "free",
        "location": "San Francisco-Oakland-Hayward, CA",
        "method": "PUT",
        "page": "NextSong",
        "registration": 1_540_919_166_796.0,
        "sessionId": 38,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0",
        "userId": user_id
    })
}

pub fn page_event(ts: i64, page: &str) -> Value {
    json!({
        "artist": null,
        "auth": "Logged In",
        "firstName": "Walter",
        "gender": "M",
        "itemInSession": 1,
        "lastName": "Frye",
        "length": null,
        "level": "free",
        "location": "San Francisco-Oakland-Hayward, CA",
        "method": "GET",
        "page": page,
        "registration": 1_540_919_166_796.0,
        "sessionId": 38,
        "song": null,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0",
        "userId": "39"
    })
}

/// Write records one per line, creating parent directories
pub fn write_records(path: &Path, records: &[Value]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let text: Vec<String> = records.iter().map(Value::to_string).collect();
    fs::write(path, text.join("\n")).unwrap();
}
