//! Session store: last-known routing state per session key.
//!
//! The store is a single JSON document mapping session key to
//! [`SessionRecord`]. Writes go through a uniquely named temp file and a
//! rename, so a reader never observes a half-written document.
//! [`SessionStore::update`] holds an advisory lock on `<store>.lock` for the
//! whole read-modify-write, which serializes writers across handles and
//! processes.

use chrono::Utc;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{SessionKey, ThreadId};

/// Session store errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Storage error.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store file exists but is not a JSON object; it is left untouched.
    #[error("Session store {} is corrupt: {source}", path.display())]
    Corrupt {
        /// Store file.
        path: PathBuf,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// The blocking store task panicked or was cancelled.
    #[error("Session store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Where replies for a session must be delivered.
///
/// Never names an internal surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    /// External channel.
    pub channel: String,
    /// Raw address on that channel.
    pub to: String,
    /// Account that handled the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Thread within `to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

/// Metadata about the most recent inbound message, from any surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOrigin {
    /// Provider that received the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Surface the message was typed into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    /// Originating channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// `direct`, `group`, `channel`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<String>,
    /// Receiving account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Thread the message arrived in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    /// Sender address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Address the message was sent to on the originating channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Sanitized, truncated body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_preview: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub received_at: i64,
}

/// Last-known routing state of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Underlying agent session id.
    pub session_id: String,

    /// Epoch milliseconds of the last write; never decreases.
    #[serde(default)]
    pub updated_at: i64,

    /// Most recent external channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_channel: Option<String>,

    /// Most recent external address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_to: Option<String>,

    /// Most recent account on `last_channel`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_account_id: Option<String>,

    /// Most recent thread within `last_to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_thread_id: Option<ThreadId>,

    /// Authoritative reply address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_context: Option<DeliveryContext>,

    /// Last inbound message metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<SessionOrigin>,

    /// Fields written by other components.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionRecord {
    /// Create an empty record with a fresh session id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_session_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create an empty record for an existing session id.
    #[must_use]
    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            updated_at: 0,
            last_channel: None,
            last_to: None,
            last_account_id: None,
            last_thread_id: None,
            delivery_context: None,
            origin: None,
            extra: Map::new(),
        }
    }

    /// Advance `updated_at` to `now_ms`, never moving it backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = self.updated_at.max(now_ms);
    }

    /// Whether the last route was on `channel`.
    #[must_use]
    pub fn last_channel_is(&self, channel: &str) -> bool {
        self.last_channel
            .as_deref()
            .is_some_and(|last| last.trim().eq_ignore_ascii_case(channel.trim()))
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw store document.
///
/// Records are kept as JSON values so a malformed entry for one key never
/// prevents reading or rewriting the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionMap(BTreeMap<String, Value>);

impl SessionMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed record for a key; malformed entries read as absent.
    #[must_use]
    pub fn record(&self, key: &str) -> Option<SessionRecord> {
        let raw = self.0.get(key)?;
        match serde_json::from_value(raw.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(session_key = key, error = %e, "Ignoring malformed session record");
                None
            }
        }
    }

    /// Insert or replace a record.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be serialized.
    pub fn insert(&mut self, key: &str, record: &SessionRecord) -> Result<(), PersistenceError> {
        self.0.insert(key.to_string(), serde_json::to_value(record)?);
        Ok(())
    }

    /// All keys in the document.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Load a store document.
///
/// A missing file is an empty store. A file that is not a JSON object is
/// also treated as empty (with a warning) so a corrupt store never blocks
/// message handling.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read.
pub fn load_session_store(path: &Path) -> Result<SessionMap, PersistenceError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionMap::new()),
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(SessionMap::new());
    }

    match serde_json::from_str::<SessionMap>(&content) {
        Ok(map) => Ok(map),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Session store unreadable, starting empty");
            Ok(SessionMap::new())
        }
    }
}

/// Strict load for read-modify-write: an unparseable document is an error,
/// never an empty map that would overwrite it.
fn load_session_store_strict(path: &Path) -> Result<SessionMap, PersistenceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionMap::new()),
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(SessionMap::new());
    }

    serde_json::from_str(&content).map_err(|source| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Save a store document atomically (unique temp file + rename).
///
/// # Errors
///
/// Returns error if serialization or any file operation fails.
pub fn save_session_store(path: &Path, map: &SessionMap) -> Result<(), PersistenceError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let data = serde_json::to_string_pretty(map)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Handle to a session store file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Open a store at `path` (the file is created on first write).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read.
    pub fn load(&self) -> Result<SessionMap, PersistenceError> {
        load_session_store(&self.path)
    }

    /// Read one record.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read.
    pub fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>, PersistenceError> {
        Ok(self.load()?.record(key.as_ref()))
    }

    /// Read-modify-write one record.
    ///
    /// `apply` receives the current record (`None` when missing or
    /// malformed) and returns the record to store. Updates from any handle
    /// or process sharing the file are serialized by the lock file, so no
    /// update is lost. A corrupt store is reported and left as it is.
    ///
    /// # Errors
    ///
    /// Returns error if the store is corrupt or cannot be read or written.
    pub async fn update<F>(&self, key: &SessionKey, apply: F) -> Result<SessionRecord, PersistenceError>
    where
        F: FnOnce(Option<SessionRecord>) -> SessionRecord + Send + 'static,
    {
        let path = self.path.clone();
        let session_key = key.clone();

        let record = tokio::task::spawn_blocking(move || -> Result<SessionRecord, PersistenceError> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(lock_path(&path))?;
            let mut lock = RwLock::new(file);
            let _guard = lock.write()?;

            let mut map = load_session_store_strict(&path)?;
            let record = apply(map.record(session_key.as_ref()));
            map.insert(session_key.as_ref(), &record)?;
            save_session_store(&path, &map)?;
            Ok(record)
        })
        .await??;

        tracing::debug!(session_key = %key, path = %self.path.display(), "Session record saved");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn seeded_store(dir: &Path, value: &Value) -> SessionStore {
        let path = dir.join("sessions.json");
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        SessionStore::new(path)
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let store = SessionStore::new(temp.path().join("nope").join("sessions.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sessions.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_session_store(&path).unwrap().is_empty());
    }

    #[test]
    fn test_record_parsing_camel_case() {
        let temp = tempdir().unwrap();
        let store = seeded_store(
            temp.path(),
            &json!({
                "agent:main:main": {
                    "sessionId": "sess-1",
                    "updatedAt": 1000,
                    "lastChannel": "telegram",
                    "lastTo": "-1001111111111:topic:999",
                    "lastThreadId": 999,
                    "deliveryContext": { "channel": "telegram", "to": "telegram:123", "accountId": "default" },
                    "compactionCount": 2
                }
            }),
        );

        let record = store.get(&SessionKey::new("agent:main:main")).unwrap().unwrap();
        assert_eq!(record.session_id, "sess-1");
        assert_eq!(record.last_thread_id, Some(ThreadId::Numeric(999)));
        assert_eq!(
            record.delivery_context.unwrap().account_id.as_deref(),
            Some("default")
        );
        assert_eq!(record.extra.get("compactionCount"), Some(&json!(2)));
    }

    #[test]
    fn test_malformed_record_reads_as_absent() {
        let temp = tempdir().unwrap();
        let store = seeded_store(
            temp.path(),
            &json!({ "agent:main:main": { "updatedAt": "yesterday" } }),
        );
        assert!(store.get(&SessionKey::new("agent:main:main")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_preserves_other_entries() {
        let temp = tempdir().unwrap();
        let store = seeded_store(
            temp.path(),
            &json!({
                "agent:other:main": { "sessionId": "keep", "updatedAt": 5 },
                "broken": 42
            }),
        );

        let key = SessionKey::new("agent:main:main");
        let saved = store
            .update(&key, |existing| {
                assert!(existing.is_none());
                let mut record = SessionRecord::with_session_id("fresh");
                record.touch(10);
                record
            })
            .await
            .unwrap();
        assert_eq!(saved.updated_at, 10);

        let map = store.load().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.record("agent:other:main").unwrap().session_id, "keep");
        assert_eq!(map.record("agent:main:main").unwrap().session_id, "fresh");

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_update_refuses_corrupt_store() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sessions.json");
        let truncated = r#"{ "agent:ops:main": { "sessionId": "keep", "updatedAt": 5 "#;
        std::fs::write(&path, truncated).unwrap();

        let store = SessionStore::new(&path);
        let result = store
            .update(&SessionKey::new("agent:main:main"), |_| SessionRecord::with_session_id("fresh"))
            .await;

        assert!(matches!(result, Err(PersistenceError::Corrupt { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), truncated);
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut record = SessionRecord::with_session_id("s");
        record.touch(100);
        record.touch(50);
        assert_eq!(record.updated_at, 100);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let temp = tempdir().unwrap();
        let store = Arc::new(SessionStore::new(temp.path().join("sessions.json")));
        let key = SessionKey::new("agent:main:main");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(&key, |existing| {
                        let mut record = existing.unwrap_or_else(|| SessionRecord::with_session_id("s"));
                        record.updated_at += 1;
                        record
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.get(&key).unwrap().unwrap();
        assert_eq!(record.updated_at, 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_handles_do_not_lose_updates() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sessions.json");

        let mut handles = Vec::new();
        for i in 0..64 {
            let store = SessionStore::new(&path);
            handles.push(tokio::spawn(async move {
                store
                    .update(&SessionKey::new(format!("agent:main:peer-{i}")), |_| {
                        SessionRecord::with_session_id("s")
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(SessionStore::new(&path).load().unwrap().len(), 64);
    }
}
