//! Content-addressed knowledge base of finished runs.
//!
//! [`ResultCache`] maps the SHA-256 digest of an instruction's text to the run that answered
//! it: the final result text plus the transcript. An entry is created the first time an
//! instruction completes and read back for every later identical instruction; entries are
//! never updated by the pipeline, expired or evicted.
//!
//! The physical layer sits behind [`CacheStore`]:
//!
//! ```text
//! knowledge/
//!   task_3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b.json
//!   task_9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08.json
//! ```
//!
//! Each file holds one JSON [`CacheEntry`]. [`FileCacheStore`] replaces whole files through a
//! temporary file and a rename, so a reader sees either the old entry or the new one, never a
//! partial write. [`ResultCache`] additionally serialises writers per key.
//!
//! # Example
//!
//! ```rust
//! use aichat::knowledge::{InMemoryCacheStore, ResultCache};
//! use aichat::transcript::Transcript;
//! use std::sync::Arc;
//!
//! let cache = ResultCache::new(Arc::new(InMemoryCacheStore::new()));
//! assert!(cache.get("what is 2+2?").is_none());
//!
//! cache.put("what is 2+2?", &Transcript::new(), "4").unwrap();
//! assert_eq!(cache.get("what is 2+2?").unwrap().result, "4");
//! ```

use crate::transcript::Transcript;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// One finished run as stored in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The exact instruction text; guards against digest collisions on lookup.
    pub instruction: String,
    pub transcript: Transcript,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheIoError {
    /// The backing storage could not be read or written.
    Io(String),
    /// A stored entry could not be encoded or decoded.
    Serialization(String),
}

impl fmt::Display for CacheIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheIoError::Io(msg) => write!(f, "knowledge store IO error: {}", msg),
            CacheIoError::Serialization(msg) => {
                write!(f, "knowledge store serialization error: {}", msg)
            }
        }
    }
}

impl Error for CacheIoError {}

impl From<io::Error> for CacheIoError {
    fn from(e: io::Error) -> Self {
        CacheIoError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CacheIoError {
    fn from(e: serde_json::Error) -> Self {
        CacheIoError::Serialization(e.to_string())
    }
}

/// Lowercase hex SHA-256 of the instruction text. Stable across processes and platforms.
pub fn instruction_digest(instruction: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(instruction.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Durable key -> entry storage that outlives the process.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheIoError>;

    /// Replace the entry for `key` as a whole.
    fn store(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheIoError>;
}

/// One JSON file per entry under a directory.
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Opens (and creates, if needed) the knowledge directory.
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("task_{}.json", key))
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheIoError> {
        let raw = match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn store(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheIoError> {
        let json = serde_json::to_string(entry)?;
        let final_path = self.path_for(key);
        let tmp_path = self
            .dir
            .join(format!(".task_{}.{}.tmp", key, uuid::Uuid::new_v4()));

        if let Err(e) = fs::write(&tmp_path, json.as_bytes())
            .and_then(|_| fs::rename(&tmp_path, &final_path))
        {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Process-local store, mainly for tests and ephemeral shells.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for InMemoryCacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheIoError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheIoError::Io("in-memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheIoError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheIoError::Io("in-memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), entry.clone());
        Ok(())
    }
}

/// The logical cache the secretary talks to.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a previous run of exactly this instruction text.
    ///
    /// A store that cannot be read is logged and reported as a miss: the run then proceeds
    /// and recomputes the answer.
    pub fn get(&self, instruction: &str) -> Option<CacheEntry> {
        let key = instruction_digest(instruction);
        match self.store.load(&key) {
            Ok(Some(entry)) if entry.instruction == instruction => Some(entry),
            Ok(Some(_)) => {
                log::warn!("knowledge entry {} belongs to a different instruction", key);
                None
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("knowledge lookup for {} failed, treating as a miss: {}", key, e);
                None
            }
        }
    }

    /// Record the run for `instruction`. Last write wins; concurrent writers to the same key
    /// are serialised and each replaces the entry as a whole.
    pub fn put(
        &self,
        instruction: &str,
        transcript: &Transcript,
        result: &str,
    ) -> Result<(), CacheIoError> {
        let key = instruction_digest(instruction);
        let key_lock = self.lock_for(&key);
        let stored = {
            let _guard = match key_lock.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let entry = CacheEntry {
                instruction: instruction.to_string(),
                transcript: transcript.clone(),
                result: result.to_string(),
            };
            self.store.store(&key, &entry)
        };
        self.release(&key, key_lock);
        stored?;
        log::debug!("knowledge entry {} written", key);
        Ok(())
    }

    /// Drop the lock entry for `key` once no other writer holds or waits on it.
    fn release(&self, key: &str, key_lock: Arc<Mutex<()>>) {
        let mut locks = match self.key_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // One reference in the map, one here: nobody else is queued.
        if Arc::strong_count(&key_lock) == 2 {
            locks.remove(key);
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.key_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
