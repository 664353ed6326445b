//! The tracked surface is owned by someone else (a browser extension, a desktop shell, or the user
//! through `clarity visibility`). They report what they see through a small JSON file in the
//! application directory and the collector polls it.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fs::operations::write_atomically;

pub const VISIBILITY_FILE_NAME: &str = "visibility.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityState {
    pub visible: bool,
    /// Active domain or window, e.g. `github.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self {
            visible: true,
            context: None,
        }
    }
}

/// Contract for anything that can tell whether the tracked surface is in the foreground.
#[cfg_attr(test, mockall::automock)]
pub trait VisibilitySource {
    /// `None` means no signal is available, in which case the collector falls back to treating the
    /// surface as visible with an unknown context.
    fn current(&mut self) -> Result<Option<VisibilityState>>;
}

/// Reads [VISIBILITY_FILE_NAME] on every poll.
pub struct StateFileVisibility {
    path: PathBuf,
}

impl StateFileVisibility {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            path: app_dir.join(VISIBILITY_FILE_NAME),
        }
    }
}

impl VisibilitySource for StateFileVisibility {
    fn current(&mut self) -> Result<Option<VisibilityState>> {
        let content = match std::fs::read(&self.path) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!("Ignoring unreadable visibility file {:?}: {e}", self.path);
                Ok(None)
            }
        }
    }
}

pub async fn write_visibility(app_dir: &Path, state: &VisibilityState) -> Result<()> {
    let content = serde_json::to_vec(state)?;
    write_atomically(&app_dir.join(VISIBILITY_FILE_NAME), &content).await?;
    Ok(())
}
