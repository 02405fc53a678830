//! Sparkify ETL - Song Play Star Schema Loader
//!
//! A Rust library for loading song metadata and user activity logs into a
//! star schema for listening analytics.
//!
//! # Features
//!
//! - Song and artist dimensions from song metadata files
//! - Time and user dimensions plus the songplay fact from activity logs
//! - Exact-match song/artist resolution for each play
//! - PostgreSQL and SQLite destinations
//! - Commit-per-file loading with deterministic file order

/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Record extraction from source files
pub mod extract;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// File-set processing and the run driver
pub mod pipeline;
/// Database schema definitions
pub mod schema;
/// Destination database sessions
pub mod warehouse;

// Re-export key components for easier access
pub use config::AppConfig;
pub use error::{EtlError, Result};
pub use pipeline::{run, run_with, Pipeline, RunSummary, SourceKind};
pub use warehouse::{PostgresWarehouse, SqliteWarehouse, Warehouse};
