//! FX Snapshot Store
//!
//! Persists the rate snapshot series and serializes every
//! load -> append -> prune -> persist cycle per backing resource, so
//! concurrent refreshes (in this process or another) merge instead of
//! overwriting each other.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::{File, TryLockError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::fx::RateSnapshot;
use crate::services::snapshot_series::SnapshotSeries;

/// Default retention window (120 days)
pub const DEFAULT_RETENTION_DAYS: i64 = 120;

const LOCK_RETRY_MIN: Duration = Duration::from_millis(10);
const LOCK_RETRY_MAX: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    LockTimeout(PathBuf),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "Snapshot storage I/O error: {}", e),
            StoreError::Serialize(e) => write!(f, "Snapshot storage format error: {}", e),
            StoreError::LockTimeout(path) => {
                write!(f, "Timed out waiting for snapshot lock {}", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Serialize(e) => Some(e),
            StoreError::LockTimeout(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialize(e)
    }
}

/// Exclusive hold on a backing resource, released when dropped.
#[derive(Debug)]
pub struct BackendLock {
    lock_file: Option<(File, PathBuf)>,
}

impl BackendLock {
    /// A lock with nothing to release, for backends that rely on the
    /// store's in-process writer mutex alone.
    pub fn in_process() -> Self {
        Self { lock_file: None }
    }

    fn file(file: File, path: PathBuf) -> Self {
        Self {
            lock_file: Some((file, path)),
        }
    }
}

impl Drop for BackendLock {
    fn drop(&mut self) {
        let Some((file, path)) = self.lock_file.take() else {
            return;
        };

        // Closing the handle also releases the lock
        if let Err(e) = file.unlock() {
            warn!(lock = %path.display(), error = %e, "Failed to release snapshot lock");
        }
    }
}

/// Storage for the serialized snapshot sequence
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Acquire exclusive access to the backing resource.
    async fn lock(&self) -> Result<BackendLock, StoreError>;

    /// Read all persisted snapshots. A missing resource is an empty series.
    async fn load(&self) -> Result<Vec<RateSnapshot>, StoreError>;

    /// Replace the persisted snapshots.
    async fn persist(&self, snapshots: &[RateSnapshot]) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}

/// JSON array on the local filesystem, guarded by an OS advisory lock on
/// `<path>.lock`.
///
/// The lock file itself is never removed. A writer that dies releases its
/// lock with the process, so a leftover file never blocks later writers.
pub struct JsonFileBackend {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        let path = path.into();
        let lock_path = sibling_path(&path, "lock");
        Self {
            path,
            lock_path,
            lock_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotBackend for JsonFileBackend {
    async fn lock(&self) -> Result<BackendLock, StoreError> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;

        let deadline = Instant::now() + self.lock_timeout;
        let mut delay = LOCK_RETRY_MIN;

        loop {
            match file.try_lock() {
                Ok(()) => {
                    debug!(lock = %self.lock_path.display(), "Acquired snapshot lock");
                    return Ok(BackendLock::file(file, self.lock_path.clone()));
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::LockTimeout(self.lock_path.clone()));
                    }

                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(LOCK_RETRY_MAX);
                }
                Err(TryLockError::Error(e)) => return Err(StoreError::Io(e)),
            }
        }
    }

    async fn load(&self) -> Result<Vec<RateSnapshot>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn persist(&self, snapshots: &[RateSnapshot]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshots)?;
        let tmp_path = sibling_path(&self.path, &format!("{}.tmp", Uuid::new_v4()));

        let result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(e));
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Snapshots held in memory only
#[derive(Default)]
pub struct MemoryBackend {
    snapshots: Mutex<Vec<RateSnapshot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn lock(&self) -> Result<BackendLock, StoreError> {
        Ok(BackendLock::in_process())
    }

    async fn load(&self) -> Result<Vec<RateSnapshot>, StoreError> {
        Ok(self.snapshots.lock().clone())
    }

    async fn persist(&self, snapshots: &[RateSnapshot]) -> Result<(), StoreError> {
        *self.snapshots.lock() = snapshots.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Result of one serialized store cycle
#[derive(Debug)]
pub struct Recorded {
    /// The series after the cycle, whether or not it reached storage
    pub series: SnapshotSeries,
    pub inserted: bool,
    pub pruned: usize,
    /// Set when the series could not be written back
    pub persist_error: Option<StoreError>,
}

pub struct SnapshotStore {
    backend: Arc<dyn SnapshotBackend>,
    retention_ms: i64,
    writer: tokio::sync::Mutex<()>,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn SnapshotBackend>, retention: chrono::Duration) -> Self {
        Self {
            backend,
            retention_ms: retention.num_milliseconds(),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    pub fn json_file(path: impl Into<PathBuf>, retention: chrono::Duration, lock_timeout: Duration) -> Self {
        Self::new(Arc::new(JsonFileBackend::new(path, lock_timeout)), retention)
    }

    pub fn in_memory(retention: chrono::Duration) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), retention)
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// Current persisted series. Missing or unreadable storage yields an
    /// empty series.
    pub async fn load(&self) -> SnapshotSeries {
        match self.backend.load().await {
            Ok(snapshots) => SnapshotSeries::from_snapshots(snapshots),
            Err(e) => {
                warn!(backend = %self.backend.describe(), error = %e, "Failed to load snapshots, using empty history");
                SnapshotSeries::new()
            }
        }
    }

    /// Insert `snapshot` (no-op on a duplicate timestamp), then prune
    /// against `now_ms` and persist.
    ///
    /// Fails only when exclusive access could not be obtained; a failed
    /// write is reported through [`Recorded::persist_error`].
    pub async fn append(&self, snapshot: RateSnapshot, now_ms: i64) -> Result<Recorded, StoreError> {
        let timestamp = snapshot.timestamp;
        let recorded = self
            .update(now_ms, self.retention_ms, move |series| series.append(snapshot))
            .await?;

        if recorded.inserted {
            info!(
                timestamp = timestamp,
                pruned = recorded.pruned,
                total = recorded.series.len(),
                "Recorded FX snapshot"
            );
        } else {
            debug!(timestamp = timestamp, "FX snapshot already stored");
        }

        Ok(recorded)
    }

    /// Remove snapshots older than `now_ms - retention` and persist.
    ///
    /// `None` uses the window the store was built with, which is also the
    /// one every `append` prunes against.
    pub async fn prune(
        &self,
        now_ms: i64,
        retention: Option<chrono::Duration>,
    ) -> Result<Recorded, StoreError> {
        let retention_ms = retention
            .map(|r| r.num_milliseconds())
            .unwrap_or(self.retention_ms);
        self.update(now_ms, retention_ms, |_| false).await
    }

    async fn update<F>(&self, now_ms: i64, retention_ms: i64, apply: F) -> Result<Recorded, StoreError>
    where
        F: FnOnce(&mut SnapshotSeries) -> bool + Send,
    {
        let _writer = self.writer.lock().await;
        let _lock = self.backend.lock().await?;

        // An I/O failure on read must not be written over: the durable copy
        // may still be intact. Corrupt content is replaced.
        let (mut series, read_error) = match self.backend.load().await {
            Ok(snapshots) => (SnapshotSeries::from_snapshots(snapshots), None),
            Err(StoreError::Serialize(e)) => {
                warn!(backend = %self.backend.describe(), error = %e, "Discarding unreadable snapshot data");
                (SnapshotSeries::new(), None)
            }
            Err(e) => {
                warn!(backend = %self.backend.describe(), error = %e, "Failed to load snapshots");
                (SnapshotSeries::new(), Some(e))
            }
        };

        let inserted = apply(&mut series);
        let pruned = series.prune(now_ms, retention_ms);

        if pruned > 0 {
            debug!(pruned = pruned, "Pruned expired FX snapshots");
        }

        let persist_error = match read_error {
            Some(e) => Some(e),
            None if inserted || pruned > 0 => {
                match self.backend.persist(series.as_slice()).await {
                    Ok(()) => None,
                    Err(e) => {
                        warn!(backend = %self.backend.describe(), error = %e, "Failed to persist snapshots");
                        Some(e)
                    }
                }
            }
            None => None,
        };

        Ok(Recorded {
            series,
            inserted,
            pruned,
            persist_error,
        })
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
