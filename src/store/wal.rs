//! Write-Ahead Log Module
//!
//! Append-only persistent log of mutating operations. Each record is one
//! line of self-describing JSON; record order is append order. Recovery
//! replays records in order and compaction rewrites the file to one SET
//! per live entry.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::store::QualifiedKey;

// == Record Types ==
/// The mutating operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalAction {
    #[serde(rename = "SET")]
    Set,
    #[serde(rename = "DELETE")]
    Delete,
}

/// One log record.
///
/// `timestamp` is wall-clock seconds since epoch and is used only to
/// re-evaluate TTLs at recovery time; replay order comes from the file,
/// not from timestamps. `namespace` is omitted for the default namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    pub timestamp: f64,
    pub action: WalAction,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl WalRecord {
    /// Builds a SET record for a qualified key.
    pub fn set(qk: &QualifiedKey, value: &str, ttl: Option<u64>) -> Self {
        Self {
            timestamp: epoch_seconds(),
            action: WalAction::Set,
            key: qk.key.clone(),
            namespace: namespace_field(&qk.namespace),
            value: Some(value.to_string()),
            ttl,
        }
    }

    /// Builds a DELETE record for a qualified key.
    pub fn delete(qk: &QualifiedKey) -> Self {
        Self {
            timestamp: epoch_seconds(),
            action: WalAction::Delete,
            key: qk.key.clone(),
            namespace: namespace_field(&qk.namespace),
            value: None,
            ttl: None,
        }
    }

    /// The qualified key this record refers to.
    pub fn qualified_key(&self) -> QualifiedKey {
        QualifiedKey::new(self.namespace.as_deref().unwrap_or(""), self.key.as_str())
    }
}

fn namespace_field(namespace: &str) -> Option<String> {
    if namespace.is_empty() {
        None
    } else {
        Some(namespace.to_string())
    }
}

/// Current wall-clock time as float seconds since epoch.
pub fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs_f64()
}

// == Wal Writer ==
/// Open append handle to the log file.
///
/// Appends are flushed to the OS on every write; fsync is deliberately not
/// issued, so a crash may lose the trailing record.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    // == Open ==
    /// Opens the log for appending, creating it if missing.
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = Self::open_append(&path).await?;
        Ok(Self { path, file })
    }

    // == Append ==
    /// Serializes one record and appends it as a line.
    pub async fn append(&mut self, record: &WalRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await
    }

    // == Reopen ==
    /// Re-acquires the append handle. Required after compaction replaces
    /// the file underneath the old handle.
    pub async fn reopen(&mut self) -> std::io::Result<()> {
        self.file = Self::open_append(&self.path).await?;
        Ok(())
    }

    /// Path of the live log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_append(path: &Path) -> std::io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path).await
    }
}

// == Recovery ==
/// Reads all records from the log in append order.
///
/// A missing file yields no records. Malformed lines are skipped with a
/// warning; a partially-written trailing record therefore cannot poison
/// recovery.
pub async fn replay(path: &Path) -> std::io::Result<Vec<WalRecord>> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut records = Vec::new();
    let mut lines = BufReader::new(file).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<WalRecord>(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!("Skipping malformed WAL record: {}", err);
            }
        }
    }
    Ok(records)
}

// == Compaction Output ==
/// Writes the compacted record set to a temporary file next to the log and
/// atomically renames it over the log.
///
/// If the temporary write fails the live log is untouched; a leftover
/// `.tmp` file from a failed rename is ignored by recovery.
pub async fn write_compacted(path: &Path, records: &[WalRecord]) -> std::io::Result<()> {
    let tmp_path = tmp_path(path);

    let mut tmp = File::create(&tmp_path).await?;
    for record in records {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        tmp.write_all(line.as_bytes()).await?;
    }
    tmp.flush().await?;
    drop(tmp);

    tokio::fs::rename(&tmp_path, path).await
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
