use crate::errors::SyncError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Synchronous string key-value storage with browser storage semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        (**self).set(key, value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        (**self).set(key, value)
    }
}

pub fn load_json<T: DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
) -> Result<Option<T>, SyncError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(
    store: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), SyncError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read and write fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), SyncError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::storage("memory store disabled"));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        self.check()?;
        let entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::storage("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.check()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::storage("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreData {
    #[serde(default)]
    pub touched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

enum WriteOp {
    Persist(StoreData),
    Flush(oneshot::Sender<()>),
}

/// JSON-file backed store. Reads are served from memory; every `set` queues
/// a snapshot for a background writer that persists it with `tokio::fs`.
///
/// A session-scoped store forgets its contents once it has been idle longer
/// than its idle period.
///
/// Opening spawns the writer, so it must happen inside a tokio runtime.
#[derive(Debug)]
pub struct FileStore {
    session_idle: Option<Duration>,
    data: Mutex<StoreData>,
    writer: mpsc::UnboundedSender<WriteOp>,
}

impl FileStore {
    pub async fn durable(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = load_data(&path).await;
        Self::start(path, None, data)
    }

    pub async fn session(path: impl Into<PathBuf>, idle: Duration) -> Self {
        let path = path.into();
        let now = Utc::now();
        let mut data = load_data(&path).await;
        if session_expired(&data, now, idle) {
            info!(path = %path.display(), "previous session ended; starting a new one");
            data = StoreData::default();
        }
        data.touched_at = Some(now);
        if let Err(err) = persist_data(&path, &data).await {
            warn!(path = %path.display(), "failed to refresh session: {err}");
        }
        Self::start(path, Some(idle), data)
    }

    fn start(path: PathBuf, session_idle: Option<Duration>, data: StoreData) -> Self {
        let (writer, ops) = mpsc::unbounded_channel();
        tokio::spawn(write_behind(path, ops));
        Self {
            session_idle,
            data: Mutex::new(data),
            writer,
        }
    }

    pub fn is_session(&self) -> bool {
        self.session_idle.is_some()
    }

    /// Resolves once every write queued before the call has been attempted.
    pub async fn flush(&self) {
        let (done, flushed) = oneshot::channel();
        if self.writer.send(WriteOp::Flush(done)).is_ok() {
            let _ = flushed.await;
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let data = self
            .data
            .lock()
            .map_err(|_| SyncError::storage("file store lock poisoned"))?;
        Ok(data.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| SyncError::storage("file store lock poisoned"))?;
        data.entries.insert(key.to_string(), value.to_string());
        if self.is_session() {
            data.touched_at = Some(Utc::now());
        }
        self.writer
            .send(WriteOp::Persist(data.clone()))
            .map_err(|_| SyncError::storage("file store writer stopped"))
    }
}

async fn write_behind(path: PathBuf, mut ops: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = ops.recv().await {
        match op {
            WriteOp::Persist(data) => {
                if let Err(err) = persist_data(&path, &data).await {
                    error!(path = %path.display(), "failed to persist storage: {err}");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

pub fn session_expired(data: &StoreData, now: DateTime<Utc>, idle: Duration) -> bool {
    match data.touched_at {
        Some(touched_at) => now - touched_at > idle,
        None => !data.entries.is_empty(),
    }
}

pub async fn load_data(path: &Path) -> StoreData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse storage file {}: {err}", path.display());
                StoreData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
        Err(err) => {
            error!("failed to read storage file {}: {err}", path.display());
            StoreData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &StoreData) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}
