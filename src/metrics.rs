use std::time::Duration;

use metrics::{counter, histogram};

use crate::schema::Table;

/// Counter of source files fully loaded and committed
pub const FILES_PROCESSED_TOTAL: &str = "sparkify_files_processed_total";
/// Counter of rows inserted, labelled by table
pub const ROWS_INSERTED_TOTAL: &str = "sparkify_rows_inserted_total";
/// Counter of songplay lookups, labelled by outcome
pub const SONG_LOOKUPS_TOTAL: &str = "sparkify_song_lookups_total";
/// Histogram of per-file load time
pub const FILE_DURATION_SECONDS: &str = "sparkify_file_duration_seconds";
/// Counter of failed runs, labelled by source
pub const ERRORS_TOTAL: &str = "sparkify_errors_total";

/// Metrics recording for a pipeline run
///
/// Emits through the `metrics` facade; nothing is exported unless the host
/// process installs a recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    /// Record a committed file
    pub fn record_file(&self, source: &'static str, duration: Duration) {
        counter!(FILES_PROCESSED_TOTAL, "source" => source).increment(1);
        histogram!(FILE_DURATION_SECONDS, "source" => source).record(duration.as_secs_f64());
    }

    /// Record an inserted row
    pub fn record_insert(&self, table: Table) {
        counter!(ROWS_INSERTED_TOTAL, "table" => table.name()).increment(1);
    }

    /// Record a songplay lookup outcome
    pub fn record_lookup(&self, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        counter!(SONG_LOOKUPS_TOTAL, "outcome" => outcome).increment(1);
    }

    /// Record a failed file
    pub fn record_error(&self, source: &'static str) {
        counter!(ERRORS_TOTAL, "source" => source).increment(1);
    }
}
