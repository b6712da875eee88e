//! File-backed unlock store.
//!
//! Persists the bonus tower unlock as a small JSON document so it survives
//! between headless sessions:
//!
//! ```json
//! {"bonus_unlocked":true}
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use td_core::unlock::UnlockStore;
use thiserror::Error;

/// Error type for unlock store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read or write the file.
    #[error("Unlock store IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid unlock document.
    #[error("Unlock store is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UnlockDocument {
    bonus_unlocked: bool,
}

/// Unlock store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileUnlockStore {
    path: PathBuf,
    unlocked: bool,
}

impl FileUnlockStore {
    /// Open the store at `path`. A missing file means nothing is unlocked.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let unlocked = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str::<UnlockDocument>(&contents)?.bonus_unlocked
        } else {
            false
        };
        tracing::debug!(path = %path.display(), unlocked, "Unlock store opened");
        Ok(Self { path, unlocked })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let document = UnlockDocument {
            bonus_unlocked: self.unlocked,
        };
        std::fs::write(&self.path, serde_json::to_string(&document)?)?;
        Ok(())
    }
}

impl UnlockStore for FileUnlockStore {
    fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn set_unlocked(&mut self) {
        self.unlocked = true;
        match self.persist() {
            Ok(()) => tracing::info!(path = %self.path.display(), "Unlock persisted"),
            Err(e) => {
                let path = self.path.display();
                tracing::error!(error = %e, path = %path, "Failed to persist unlock");
            }
        }
    }
}
