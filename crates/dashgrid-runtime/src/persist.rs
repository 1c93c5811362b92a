//! Layout persistence: snapshot format, storage backends, retrying saver.
//!
//! The engine hands every committed layout to a [`Persister`], which writes a
//! JSON [`LayoutSnapshot`] through a [`LayoutStorage`] backend. A failed write
//! is retried on the [`RetryPolicy`] schedule from [`Persister::tick`]; a newer
//! save replaces any retry still pending, so storage only ever receives the
//! latest layout.

use std::fmt;
use std::sync::RwLock;

use dashgrid_layout::{LayoutItem, invariant_report};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::retry::RetryPolicy;

/// Current snapshot schema version.
pub const LAYOUT_SCHEMA_VERSION: u16 = 1;

/// Storage key used when the host does not pick one.
pub const DEFAULT_STORAGE_KEY: &str = "dashgrid.layout";

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serialized form of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub schema_version: u16,
    pub columns: u32,
    pub items: Vec<LayoutItem>,
}

/// Why a snapshot could not be used.
#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    UnsupportedSchemaVersion { found: u16, expected: u16 },
    ZeroColumns,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "snapshot JSON error: {e}"),
            Self::UnsupportedSchemaVersion { found, expected } => write!(
                f,
                "unsupported snapshot schema version {found} (expected {expected})"
            ),
            Self::ZeroColumns => f.write_str("snapshot declares zero columns"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl LayoutSnapshot {
    pub fn new(columns: u32, items: &[LayoutItem]) -> Self {
        Self {
            schema_version: LAYOUT_SCHEMA_VERSION,
            columns,
            items: items.to_vec(),
        }
    }

    /// Check the envelope. Item geometry is not checked here: a loaded layout
    /// goes through the same reflow as any initial layout.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema_version != LAYOUT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedSchemaVersion {
                found: self.schema_version,
                expected: LAYOUT_SCHEMA_VERSION,
            });
        }
        if self.columns == 0 {
            return Err(SnapshotError::ZeroColumns);
        }
        Ok(())
    }

    /// Whether the items already satisfy every layout invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        invariant_report(&self.items, self.columns).is_clean()
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Json)
    }

    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json).map_err(SnapshotError::Json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Failure reported by a storage backend.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    /// The backend refused the write (quota, permissions, offline).
    Unavailable(String),
    Corruption(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            Self::Corruption(msg) => write!(f, "storage corruption: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value backend for serialized layouts.
pub trait LayoutStorage: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Stored JSON for `key`, `None` on first run.
    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the JSON stored under `key`.
    fn save(&self, key: &str, json: &str) -> StorageResult<()>;
}

/// In-memory backend, for tests and hosts without durable storage.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<FxHashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, json: impl Into<String>) -> Self {
        let mut data = FxHashMap::default();
        data.insert(key.into(), json.into());
        Self {
            data: RwLock::new(data),
        }
    }
}

impl LayoutStorage for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &str, json: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.insert(key.to_owned(), json.to_owned());
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage").field("entries", &count).finish()
    }
}

// ---------------------------------------------------------------------------
// Persister
// ---------------------------------------------------------------------------

/// Failure loading a persisted layout.
#[derive(Debug)]
pub enum PersistError {
    Storage(StorageError),
    Snapshot(SnapshotError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "layout storage failed: {e}"),
            Self::Snapshot(e) => write!(f, "stored layout is unusable: {e}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Snapshot(e) => Some(e),
        }
    }
}

impl From<StorageError> for PersistError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<SnapshotError> for PersistError {
    fn from(e: SnapshotError) -> Self {
        Self::Snapshot(e)
    }
}

/// What happened to one save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// Write failed; retry number `retry` (0-indexed) is due at `due`.
    RetryScheduled { retry: u32, due: Instant },
    /// Retries exhausted; the layout was not persisted.
    Abandoned,
}

#[derive(Debug, Clone)]
struct PendingSave {
    json: String,
    retry: u32,
    due: Instant,
}

/// Saves layouts under one key, retrying failed writes.
pub struct Persister {
    key: String,
    storage: Box<dyn LayoutStorage>,
    policy: RetryPolicy,
    pending: Option<PendingSave>,
}

impl fmt::Debug for Persister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persister")
            .field("key", &self.key)
            .field("storage", &self.storage.name())
            .field("policy", &self.policy)
            .field("pending_retry", &self.pending.as_ref().map(|p| p.retry))
            .finish()
    }
}

impl Persister {
    pub fn new(storage: impl LayoutStorage + 'static) -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_owned(),
            storage: Box::new(storage),
            policy: RetryPolicy::persistence_default(),
            pending: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn storage(&self) -> &dyn LayoutStorage {
        self.storage.as_ref()
    }

    /// Read the stored layout, if any.
    pub fn load(&self) -> Result<Option<LayoutSnapshot>, PersistError> {
        let Some(json) = self.storage.load(&self.key)? else {
            return Ok(None);
        };
        let snapshot = LayoutSnapshot::from_json(&json)?;
        tracing::debug!(
            target: "dashgrid.persist",
            key = %self.key,
            items = snapshot.items.len(),
            "layout loaded"
        );
        Ok(Some(snapshot))
    }

    /// Save a snapshot now, scheduling retries on failure.
    ///
    /// Supersedes any retry still pending for an older layout.
    pub fn save(&mut self, snapshot: &LayoutSnapshot, now: Instant) -> SaveStatus {
        self.pending = None;
        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(target: "dashgrid.persist", key = %self.key, error = %err, "layout could not be serialized");
                return SaveStatus::Abandoned;
            }
        };
        self.attempt(json, 0, now)
    }

    /// Run a due retry, if any.
    pub fn tick(&mut self, now: Instant) -> Option<SaveStatus> {
        let due = self.pending.as_ref().is_some_and(|pending| now >= pending.due);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;
        Some(self.attempt(pending.json, pending.retry + 1, now))
    }

    /// When the next retry is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due)
    }

    #[must_use]
    pub fn has_pending_retry(&self) -> bool {
        self.pending.is_some()
    }

    /// `attempt` 0 is the initial write; `n > 0` is retry `n - 1`.
    fn attempt(&mut self, json: String, attempt: u32, now: Instant) -> SaveStatus {
        match self.storage.save(&self.key, &json) {
            Ok(()) => {
                tracing::debug!(target: "dashgrid.persist", key = %self.key, attempt, "layout saved");
                SaveStatus::Saved
            }
            Err(err) if attempt < self.policy.max_retries => {
                let due = now + self.policy.delay(attempt);
                tracing::warn!(
                    target: "dashgrid.persist",
                    key = %self.key,
                    attempt = attempt + 1,
                    error = %err,
                    "failed to persist layout, retry scheduled"
                );
                self.pending = Some(PendingSave {
                    json,
                    retry: attempt,
                    due,
                });
                SaveStatus::RetryScheduled { retry: attempt, due }
            }
            Err(err) => {
                tracing::error!(
                    target: "dashgrid.persist",
                    key = %self.key,
                    retries = self.policy.max_retries,
                    error = %err,
                    "permanent failure persisting layout"
                );
                SaveStatus::Abandoned
            }
        }
    }
}
