//! Append-only JSON-lines test history.

use apidesk_registry::error::HistoryError;
use apidesk_registry::history::{HistoryEntry, HistoryRecorder, sort_most_recent_first};
use apidesk_registry::model::{ResolvedRequest, TestResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// File I/O runs on the blocking pool; appends and reads are serialized by one lock.
pub struct JsonlHistory {
    inner: Arc<Inner>,
    sequence: AtomicU64,
}

struct Inner {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlHistory {
    /// Open (or lazily create) a history file. Sequence numbers continue after the highest one
    /// already stored.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let next = read_entries(&path)?
            .iter()
            .map(|e| e.sequence + 1)
            .max()
            .unwrap_or(0);
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                lock: Mutex::new(()),
            }),
            sequence: AtomicU64::new(next),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, HistoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, HistoryError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| HistoryError::Storage(format!("history task failed: {e}")))?
    }
}

impl Inner {
    fn append(&self, line: &[u8]) -> Result<(), HistoryError> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line)?;
        Ok(())
    }

    fn read(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let _guard = self.lock.lock();
        read_entries(&self.path)
    }
}

fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>, HistoryError> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryEntry>(&line) {
            Ok(entry) => out.push(entry),
            Err(e) => warn!(
                path = %path.display(),
                line = idx + 1,
                error = %e,
                "skipping unreadable history line"
            ),
        }
    }
    Ok(out)
}

#[async_trait]
impl HistoryRecorder for JsonlHistory {
    async fn record(
        &self,
        api_id: &str,
        request: &ResolvedRequest,
        result: &TestResult,
    ) -> Result<(), HistoryError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let entry = HistoryEntry::new(api_id, request, result, sequence);
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.blocking(move |inner| inner.append(&line)).await
    }

    async fn entries_by_api(&self, api_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries: Vec<HistoryEntry> = self
            .blocking(Inner::read)
            .await?
            .into_iter()
            .filter(|e| e.api_id == api_id)
            .collect();
        sort_most_recent_first(&mut entries);
        Ok(entries)
    }
}
