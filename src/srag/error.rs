use std::path::PathBuf;
use thiserror::Error;

use crate::database::DatabaseError;

/// Failures of the CSV ingestion pipeline
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV directory not found: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("No CSV files found in {}", .0.display())]
    NoCsvFiles(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Batch insert failed: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failures of the query services. Storage details stay in the source chain
/// and are never shown to API clients.
#[derive(Debug, Error)]
pub enum SragError {
    #[error("Failed to fetch chart data")]
    ChartData(#[source] DatabaseError),

    #[error("Failed to fetch metrics")]
    Metrics(#[source] DatabaseError),

    #[error("Failed to fetch SRAG list")]
    List(#[source] DatabaseError),

    #[error("Invalid period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
}
