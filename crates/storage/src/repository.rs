//! Repository Implementation

use crate::file_sink::JsonlHistoryFile;
use crate::report::DailyReport;
use crate::StorageError;
use alerting::{HistorySink, NotifyError};
use chrono::{DateTime, NaiveDate, Utc};
use dms::AlertLevel;
use landmark_source::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Records returned by a history listing unless asked otherwise
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// One logged alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    pub session_id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    /// Wall-clock time the record was written
    pub recorded_at: DateTime<Utc>,
    /// Monotonic stream time of the alert (seconds)
    pub offset_sec: f64,
}

/// Alert history (in-memory, optionally mirrored to a JSON-lines file)
pub struct HistoryRepository {
    records: Mutex<VecDeque<HistoryRecord>>,
    /// Max records kept in memory
    max_records: usize,
    next_id: Mutex<u64>,
    session_id: Mutex<Uuid>,
    file: Option<JsonlHistoryFile>,
}

impl HistoryRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_records: usize) -> Self {
        info!("Creating in-memory history repository");
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records.min(1024))),
            max_records: max_records.max(1),
            next_id: Mutex::new(1),
            session_id: Mutex::new(Uuid::nil()),
            file: None,
        }
    }

    /// Repository backed by a JSON-lines file; existing records are loaded
    pub fn with_file(path: impl AsRef<Path>, max_records: usize) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let existing = JsonlHistoryFile::load(path)?;
        let mut repo = Self::with_capacity(max_records);

        {
            let mut records = repo.lock_records()?;
            let skip = existing.len().saturating_sub(repo.max_records);
            records.extend(existing.into_iter().skip(skip));
            let next = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
            *repo.next_id.lock().map_err(|e| StorageError::Lock(e.to_string()))? = next;
            info!("Loaded {} history records from {}", records.len(), path.display());
        }

        repo.file = Some(JsonlHistoryFile::open(path)?);
        Ok(repo)
    }

    fn lock_records(&self) -> Result<std::sync::MutexGuard<'_, VecDeque<HistoryRecord>>, StorageError> {
        self.records
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Tag subsequent records with a monitoring session
    pub fn start_session(&self, session_id: Uuid) -> Result<(), StorageError> {
        *self
            .session_id
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))? = session_id;
        Ok(())
    }

    /// Insert a record
    pub fn insert(&self, level: AlertLevel, message: &str, offset: Timestamp) -> Result<HistoryRecord, StorageError> {
        let session_id = *self
            .session_id
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        let record = {
            let mut id = self
                .next_id
                .lock()
                .map_err(|e| StorageError::Lock(e.to_string()))?;
            let record = HistoryRecord {
                id: *id,
                session_id,
                level,
                message: message.to_string(),
                recorded_at: Utc::now(),
                offset_sec: offset.as_secs_f64(),
            };
            *id += 1;
            record
        };

        if let Some(file) = &self.file {
            file.append(&record)?;
        }

        let mut records = self.lock_records()?;
        // Enforce retention
        while records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record.clone());
        debug!("Inserted history record {} ({})", record.id, record.level);

        Ok(record)
    }

    /// Most recent records first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, StorageError> {
        let records = self.lock_records()?;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    /// Records at or above a level, most recent first
    pub fn recent_at_least(&self, level: AlertLevel, limit: usize) -> Result<Vec<HistoryRecord>, StorageError> {
        let records = self.lock_records()?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.level >= level)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Remove every record, including the backing file
    pub fn clear(&self) -> Result<usize, StorageError> {
        let mut records = self.lock_records()?;
        let removed = records.len();
        records.clear();
        if let Some(file) = &self.file {
            file.truncate()?;
        }
        info!("Cleared {} history records", removed);
        Ok(removed)
    }

    pub fn daily_report(&self, date: NaiveDate) -> Result<DailyReport, StorageError> {
        let records = self.lock_records()?;
        Ok(DailyReport::from_records(date, records.iter()))
    }

    /// Get total record count
    pub fn count(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for HistoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl HistorySink for HistoryRepository {
    fn record(&self, level: AlertLevel, reason: &str, timestamp: Timestamp) -> Result<(), NotifyError> {
        self.insert(level, reason, timestamp)
            .map(|_| ())
            .map_err(|e| NotifyError::History(e.to_string()))
    }
}
