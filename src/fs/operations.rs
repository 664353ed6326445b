use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt};

/// Writes `content` next to `path` first and renames it over `path` afterwards, so readers (and a
/// crash mid-write) only ever see the old or the new document, never a half written one.
pub async fn write_atomically(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let temporary = temporary_path(path);
    let mut file = File::create(&temporary).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&temporary, path).await
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|v| v.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Exclusive lock held for the lifetime of the returned file. Used to make sure only one daemon
/// writes snapshots for an application directory.
pub async fn acquire_instance_lock(path: &Path) -> Result<File> {
    let file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;
    file.try_lock_exclusive()
        .map_err(|e| anyhow!("Another instance holds {path:?}: {e}"))?;
    Ok(file)
}
