//! JSON-lines history file

use crate::repository::HistoryRecord;
use crate::StorageError;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Append-only history file, one record per line
pub struct JsonlHistoryFile {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlHistoryFile {
    /// Open for appending, creating the file and its directory if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("History file {}", path.display());

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn append(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let line = serde_json::to_string(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    /// Read every record back. Unreadable lines are skipped with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<HistoryRecord>, StorageError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping history line {}: {}", index + 1, e),
            }
        }
        Ok(records)
    }

    /// Drop every stored record
    pub fn truncate(&self) -> Result<(), StorageError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        writer.flush()?;
        File::create(&self.path)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        *writer = BufWriter::new(file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
