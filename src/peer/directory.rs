//! Username -> transfer address lookup kept on the peer side.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::utils::{Result, ShareError};

#[async_trait]
pub trait PeerDirectory: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<String>;

    /// Replaces every record with `entries` (username, transfer address).
    async fn replace(&self, entries: Vec<(String, String)>) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryDirectory {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PeerDirectory for MemoryDirectory {
    async fn lookup(&self, username: &str) -> Result<String> {
        self.entries
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| ShareError::PeerNotFound(username.to_string()))
    }

    async fn replace(&self, entries: Vec<(String, String)>) -> Result<()> {
        *self.entries.write().await = entries.into_iter().collect();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DirectoryRecord {
    username: String,
    address: String,
}

/// Directory persisted as a JSON array of records. The file is re-read on
/// every lookup and rewritten on every refresh; a missing file is an empty
/// directory.
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> Result<Vec<DirectoryRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ShareError::IoError(format!(
                "Failed to read {:?}: {}",
                self.path, e
            ))),
        }
    }
}

#[async_trait]
impl PeerDirectory for FileDirectory {
    async fn lookup(&self, username: &str) -> Result<String> {
        self.load()
            .await?
            .into_iter()
            .find(|record| record.username == username)
            .map(|record| record.address)
            .ok_or_else(|| ShareError::PeerNotFound(username.to_string()))
    }

    async fn replace(&self, entries: Vec<(String, String)>) -> Result<()> {
        let records: Vec<DirectoryRecord> = entries
            .into_iter()
            .map(|(username, address)| DirectoryRecord { username, address })
            .collect();

        let serialized = serde_json::to_vec_pretty(&records)?;
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|e| ShareError::IoError(format!("Failed to write {:?}: {}", self.path, e)))?;

        debug!("Peer directory refreshed with {} records", records.len());
        Ok(())
    }
}
