use std::{future::Future, io::ErrorKind, ops::Deref, path::PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::debug;

use crate::{fs::operations::write_atomically, utils::time::date_to_snapshot_key};

use super::entities::{TodayMirror, UsageSnapshot};

pub const MIRROR_FILE_NAME: &str = "today.json";

/// Interface for abstracting storage of daily snapshots.
pub trait SnapshotStorage {
    /// Retrieves the snapshot stored for a day. `None` means nothing was recorded that day.
    fn load(&self, date: NaiveDate) -> impl Future<Output = Result<Option<UsageSnapshot>>> + Send;

    /// Replaces the snapshot of a day. Either the whole snapshot lands or nothing does.
    fn save(
        &self,
        date: NaiveDate,
        snapshot: &UsageSnapshot,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Deref> SnapshotStorage for T
where
    T::Target: SnapshotStorage,
{
    fn load(&self, date: NaiveDate) -> impl Future<Output = Result<Option<UsageSnapshot>>> + Send {
        self.deref().load(date)
    }

    fn save(
        &self,
        date: NaiveDate,
        snapshot: &UsageSnapshot,
    ) -> impl Future<Output = Result<()>> + Send {
        self.deref().save(date, snapshot)
    }
}

/// The main realization of [SnapshotStorage]. Snapshots live in `<dir>/YYYY-MM-DD.json`, and the
/// most recently saved one is mirrored into `<dir>/today.json` using flat keys.
pub struct SnapshotStorageImpl {
    snapshot_dir: PathBuf,
}

impl SnapshotStorageImpl {
    pub fn new(snapshot_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&snapshot_dir)?;

        Ok(Self { snapshot_dir })
    }

    fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.snapshot_dir
            .join(format!("{}.json", date_to_snapshot_key(date)))
    }

    pub async fn load_mirror(&self) -> Result<Option<TodayMirror>> {
        match tokio::fs::read(self.snapshot_dir.join(MIRROR_FILE_NAME)).await {
            Ok(content) => Ok(Some(serde_json::from_slice(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl SnapshotStorage for SnapshotStorageImpl {
    async fn load(&self, date: NaiveDate) -> Result<Option<UsageSnapshot>> {
        let path = self.snapshot_path(date);
        debug!("Loading snapshot {path:?}");
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Some(serde_json::from_slice::<UsageSnapshot>(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, date: NaiveDate, snapshot: &UsageSnapshot) -> Result<()> {
        let content = serde_json::to_vec(snapshot)?;
        write_atomically(&self.snapshot_path(date), &content).await?;

        let mirror = serde_json::to_vec(&TodayMirror::from(snapshot))?;
        write_atomically(&self.snapshot_dir.join(MIRROR_FILE_NAME), &mirror).await?;
        Ok(())
    }
}
