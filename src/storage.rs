//! Durable local fallback for undelivered events.
//!
//! When the sink cannot be reached the dispatcher writes the current buffer
//! to a single named slot. The slot always holds the most recent snapshot;
//! nothing is merged. Draining the slot is left to an external retry process.

use crate::core::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Name of the pending-events slot.
pub const PENDING_SLOT_KEY: &str = "pendingProctoringEvents";

/// A buffer snapshot awaiting delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    pub session_id: Uuid,
    /// Dispatch sequence of the event whose delivery failed
    pub sequence: u64,
    pub saved_at: DateTime<Utc>,
    pub events: Vec<Event>,
}

impl PendingSnapshot {
    pub fn new(session_id: Uuid, sequence: u64, events: Vec<Event>) -> Self {
        Self {
            session_id,
            sequence,
            saved_at: Utc::now(),
            events,
        }
    }
}

/// Storage errors.
#[derive(Debug)]
pub enum StorageError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(e) => write!(f, "IO error: {e}"),
            StorageError::ParseError(e) => write!(f, "Parse error: {e}"),
            StorageError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// A single durable slot for the latest unsent snapshot.
pub trait PendingStore: Send + Sync {
    /// Replace the slot contents.
    fn save(&self, snapshot: &PendingSnapshot) -> Result<(), StorageError>;

    fn load(&self) -> Result<Option<PendingSnapshot>, StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

/// Slot backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    /// Slot file inside `dir`, named after [`PENDING_SLOT_KEY`].
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{PENDING_SLOT_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PendingStore for FileSlot {
    fn save(&self, snapshot: &PendingSnapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StorageError::SerializeError(e.to_string()))?;

        // Write-then-rename so a reader never sees a torn snapshot. Each save
        // gets its own temp file so overlapping writers never share one.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let written = std::fs::write(&tmp, json).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(StorageError::IoError(e.to_string()));
        }
        Ok(())
    }

    fn load(&self) -> Result<Option<PendingSnapshot>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StorageError::IoError(e.to_string()))?;
        let snapshot =
            serde_json::from_str(&content).map_err(|e| StorageError::ParseError(e.to_string()))?;
        Ok(Some(snapshot))
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(e.to_string())),
        }
    }
}

/// In-memory slot holding the serialized snapshot.
#[derive(Debug, Default)]
pub struct MemorySlot {
    slot: Mutex<Option<String>>,
    writes: Mutex<u64>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    pub fn writes(&self) -> u64 {
        *self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PendingStore for MemorySlot {
    fn save(&self, snapshot: &PendingSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| StorageError::SerializeError(e.to_string()))?;
        *self.slot() = Some(json);
        *self.writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<PendingSnapshot>, StorageError> {
        match self.slot().as_deref() {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| StorageError::ParseError(e.to_string())),
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot() = None;
        Ok(())
    }
}
