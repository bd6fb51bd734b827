//! Subscriber list, persisted as a JSON file.
//!
//! The file is read on every access so subscribers added with
//! `slotwatch subscribers add` reach a running poller on its next broadcast.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ServerError, ServerResult};

/// A chat that receives slot notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Telegram chat id.
    pub id: i64,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SubscriberFile {
    #[serde(default)]
    subscribers: Vec<Subscriber>,
}

/// File-backed subscriber list.
#[derive(Debug)]
pub struct SubscriberStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl SubscriberStore {
    /// Creates a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All subscribers, in subscription order.
    pub async fn list(&self) -> ServerResult<Vec<Subscriber>> {
        let _guard = self.lock.lock().await;
        Ok(self.read()?.subscribers)
    }

    /// Subscriber ids, in subscription order.
    pub async fn ids(&self) -> ServerResult<Vec<i64>> {
        Ok(self.list().await?.into_iter().map(|s| s.id).collect())
    }

    /// Adds a subscriber. Returns false if it was already subscribed.
    pub async fn add(&self, id: i64) -> ServerResult<bool> {
        let _guard = self.lock.lock().await;
        let mut file = self.read()?;
        if file.subscribers.iter().any(|s| s.id == id) {
            return Ok(false);
        }
        file.subscribers.push(Subscriber {
            id,
            subscribed_at: Utc::now(),
        });
        self.write(&file)?;
        info!(subscriber = id, "subscriber added");
        Ok(true)
    }

    /// Removes a subscriber. Returns false if it was not subscribed.
    pub async fn remove(&self, id: i64) -> ServerResult<bool> {
        let _guard = self.lock.lock().await;
        let mut file = self.read()?;
        let before = file.subscribers.len();
        file.subscribers.retain(|s| s.id != id);
        if file.subscribers.len() == before {
            return Ok(false);
        }
        self.write(&file)?;
        info!(subscriber = id, "subscriber removed");
        Ok(true)
    }

    fn read(&self) -> ServerResult<SubscriberFile> {
        if !self.path.exists() {
            return Ok(SubscriberFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SubscriberFile::default());
        }
        serde_json::from_str(&content)
            .map_err(|e| ServerError::store_format(self.path.display().to_string(), e.to_string()))
    }

    fn write(&self, file: &SubscriberFile) -> ServerResult<()> {
        let content = serde_json::to_string_pretty(file).map_err(|e| {
            ServerError::store_format(self.path.display().to_string(), e.to_string())
        })?;
        write_atomic(&self.path, &content)
    }
}

/// Writes `content` to a temp file next to `path`, then renames it over `path`.
fn write_atomic(path: &Path, content: &str) -> ServerResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}
