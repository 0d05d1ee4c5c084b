//! Signed-in identity, persisted at `~/.taskdeck/session.yaml` (mode 0600).
//!
//! No file means signed out.

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::store::{ensure_private_dir, read_yaml, taskdeck_root, write_yaml_atomic};
use crate::types::Identity;

/// `<home>/.taskdeck/session.yaml`
pub fn session_path_at(home: &Path) -> PathBuf {
    taskdeck_root(home).join("session.yaml")
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    home: PathBuf,
}

impl SessionStore {
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// The current identity, or `None` when signed out.
    pub fn load(&self) -> Result<Option<Identity>, StoreError> {
        let path = session_path_at(&self.home);
        if !path.exists() {
            return Ok(None);
        }
        read_yaml(&path).map(Some)
    }

    /// Replace the stored identity.
    pub fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        ensure_private_dir(&taskdeck_root(&self.home))?;
        write_yaml_atomic(&session_path_at(&self.home), identity)
    }

    /// Sign out locally. Idempotent; returns whether a session existed.
    pub fn clear(&self) -> Result<bool, StoreError> {
        let path = session_path_at(&self.home);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(path, e)),
        }
    }
}
