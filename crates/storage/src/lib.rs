//! Storage Layer
//!
//! Alert history: in-memory repository with retention, optional JSON-lines
//! file persistence, and the daily safety report.

mod file_sink;
mod report;
mod repository;

pub use file_sink::JsonlHistoryFile;
pub use report::DailyReport;
pub use repository::{HistoryRecord, HistoryRepository, DEFAULT_RECENT_LIMIT};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
