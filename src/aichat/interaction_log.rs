//! Append-only record of every remote invocation.
//!
//! This is not the diagnostic log (that goes through the `log` facade); it is the durable
//! `logs.txt` style audit trail of prompts and replies. Nothing in the crate reads it back.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One invocation as it is written to the interaction log.
#[derive(Debug, Clone)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Local>,
    pub user_input: String,
    pub agent_name: String,
    pub response: String,
}

impl InteractionRecord {
    pub fn now(
        user_input: impl Into<String>,
        agent_name: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            user_input: user_input.into(),
            agent_name: agent_name.into(),
            response: response.into(),
        }
    }

    /// `[2025-01-31 08:15:02] User: <prompt> | <agent>: <response>`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] User: {} | {}: {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.user_input,
            self.agent_name,
            self.response
        )
    }
}

/// Sink for [`InteractionRecord`]s. Implementations must never fail the caller.
pub trait InteractionLogger: Send + Sync {
    fn append(&self, record: &InteractionRecord);
}

/// Discards every record.
pub struct NoopInteractionLog;

impl InteractionLogger for NoopInteractionLog {
    fn append(&self, _record: &InteractionRecord) {}
}

/// Appends one line per record to a text file.
///
/// Concurrent agents share one instance; the mutex keeps lines from interleaving.
pub struct FileInteractionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileInteractionLog {
    /// Creates the parent directory if needed. The file itself is created on first append.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InteractionLogger for FileInteractionLog {
    fn append(&self, record: &InteractionRecord) {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(record.to_line().as_bytes()));

        if let Err(e) = result {
            log::warn!(
                "Could not append to interaction log {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
