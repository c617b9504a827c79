//! Match snapshot persistence.
//!
//! Snapshots are JSON files under three directories of the data root:
//! `active/` holds the latest autosave of a running match, `saved/` holds
//! named manual saves and `finished/` archives completed matches.
//!
//! Autosaves and archives carry a revision taken from a counter that only
//! grows. Writes for one match are serialized, and a write older than the
//! last one stored for that match is dropped, so a slow autosave can never
//! overwrite a newer snapshot or bring back the autosave of an archived
//! match.

use broadside_core::{Match, MatchId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("invalid save name {0:?}")]
    InvalidName(String),
}

/// One file in a save listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEntry {
    /// `None` for the autosave
    pub name: Option<String>,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
}

impl SaveEntry {
    fn from_metadata(name: Option<String>, meta: &Metadata) -> Result<Self, StoreError> {
        Ok(Self {
            name,
            modified_at: meta.modified()?.into(),
            size: meta.len(),
        })
    }
}

/// Everything stored for one match that can be loaded back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveListing {
    pub autosave: Option<SaveEntry>,
    /// Newest first
    pub named: Vec<SaveEntry>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    /// Last revision written per match
    written: Arc<DashMap<MatchId, Arc<Mutex<u64>>>>,
}

fn check_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Arc::new(DashMap::new()),
        }
    }

    fn active_dir(&self) -> PathBuf {
        self.root.join("active")
    }

    fn saved_dir(&self) -> PathBuf {
        self.root.join("saved")
    }

    fn finished_dir(&self) -> PathBuf {
        self.root.join("finished")
    }

    fn active_path(&self, id: MatchId) -> PathBuf {
        self.active_dir().join(format!("{id}.json"))
    }

    fn saved_path(&self, id: MatchId, name: &str) -> PathBuf {
        self.saved_dir().join(format!("{id}_{name}.json"))
    }

    fn write_lock(&self, id: MatchId) -> Arc<Mutex<u64>> {
        Arc::clone(self.written.entry(id).or_default().value())
    }

    /// Create the directory layout
    pub async fn init(&self) -> Result<(), StoreError> {
        for dir in [self.active_dir(), self.saved_dir(), self.finished_dir()] {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    async fn write(path: &Path, snapshot: &str) -> Result<(), StoreError> {
        // Write then rename so a crash never leaves a truncated snapshot
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, snapshot).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Overwrite the autosave of a running match.
    ///
    /// Returns `None` when a snapshot at `revision` or later is already
    /// stored for the match.
    pub async fn autosave(
        &self,
        id: MatchId,
        revision: u64,
        snapshot: &str,
    ) -> Result<Option<PathBuf>, StoreError> {
        let lock = self.write_lock(id);
        let mut written = lock.lock().await;
        if revision <= *written {
            return Ok(None);
        }

        let path = self.active_path(id);
        Self::write(&path, snapshot).await?;
        *written = revision;
        Ok(Some(path))
    }

    /// Store a named save alongside the autosave
    pub async fn save_named(
        &self,
        id: MatchId,
        name: &str,
        snapshot: &str,
    ) -> Result<PathBuf, StoreError> {
        check_name(name)?;
        let path = self.saved_path(id, name);
        Self::write(&path, snapshot).await?;
        Ok(path)
    }

    /// Move a finished match into the archive and drop its autosave.
    ///
    /// Autosaves older than `revision` that are still in flight find a
    /// newer revision recorded and write nothing.
    pub async fn archive(
        &self,
        id: MatchId,
        revision: u64,
        snapshot: &str,
    ) -> Result<Option<PathBuf>, StoreError> {
        let lock = self.write_lock(id);
        let mut written = lock.lock().await;
        if revision <= *written {
            return Ok(None);
        }

        let path = self.finished_dir().join(format!("{id}.json"));
        Self::write(&path, snapshot).await?;
        *written = revision;
        match fs::remove_file(self.active_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Some(path))
    }

    /// Load the autosave of a match
    pub async fn load(&self, id: MatchId) -> Result<Match, StoreError> {
        let data = fs::read_to_string(self.active_path(id)).await?;
        Ok(Match::restore(&data)?)
    }

    /// Load a named save
    pub async fn load_named(&self, id: MatchId, name: &str) -> Result<Match, StoreError> {
        check_name(name)?;
        let data = fs::read_to_string(self.saved_path(id, name)).await?;
        Ok(Match::restore(&data)?)
    }

    /// The autosave and named saves stored for a match
    pub async fn list_saves(&self, id: MatchId) -> Result<SaveListing, StoreError> {
        let autosave = match fs::metadata(self.active_path(id)).await {
            Ok(meta) => Some(SaveEntry::from_metadata(None, &meta)?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{id}_");
        let mut named = Vec::new();
        let mut entries = fs::read_dir(self.saved_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name
                .to_str()
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            let meta = entry.metadata().await?;
            named.push(SaveEntry::from_metadata(Some(name.to_string()), &meta)?);
        }
        named.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));

        Ok(SaveListing { autosave, named })
    }

    /// Ids of every match with an autosave
    pub async fn list_active(&self) -> Result<Vec<MatchId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(self.active_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse() {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
