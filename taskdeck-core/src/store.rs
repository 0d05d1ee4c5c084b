//! On-disk profile cache.
//!
//! # Storage layout
//!
//! ```text
//! ~/.taskdeck/
//!   profiles/
//!     <user_id>.yaml   (one file per cached profile, mode 0600)
//! ```
//!
//! # API pattern
//!
//! [`ProfileCache::at`] takes an explicit home. Callers resolve it with
//! [`home_dir`]; tests pass a `TempDir`.

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::types::{ProfileRecord, UserId};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.taskdeck/`
pub fn taskdeck_root(home: &Path) -> PathBuf {
    home.join(".taskdeck")
}

/// `<home>/.taskdeck/profiles/`
pub fn profiles_dir_at(home: &Path) -> PathBuf {
    taskdeck_root(home).join("profiles")
}

/// `<home>/.taskdeck/profiles/<user_id>.yaml`. Pure, no I/O.
///
/// Ids come from the backend, so anything that is not a single plain path
/// component is rejected.
pub fn profile_path_at(home: &Path, id: &UserId) -> Result<PathBuf, StoreError> {
    let raw = id.0.as_str();
    let plain = !raw.is_empty()
        && !raw.starts_with('.')
        && !raw.contains(['/', '\\', '\0'])
        && !raw.contains("..");
    if !plain {
        return Err(StoreError::InvalidRecordId { id: raw.to_string() });
    }
    Ok(profiles_dir_at(home).join(format!("{raw}.yaml")))
}

// ---------------------------------------------------------------------------
// 2. Cache handle
// ---------------------------------------------------------------------------

/// Upsert-only cache of profile records keyed by [`UserId`].
///
/// Holds at most one record per id. Records are never deleted here.
#[derive(Debug, Clone)]
pub struct ProfileCache {
    home: PathBuf,
}

impl ProfileCache {
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Load the cached record for `id`.
    ///
    /// Returns `Ok(None)` if nothing is cached,
    /// `StoreError::Parse` (with path + line context) if the file is malformed.
    pub fn get(&self, id: &UserId) -> Result<Option<ProfileRecord>, StoreError> {
        let path = profile_path_at(&self.home, id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_yaml(&path).map(Some)
    }

    /// Insert or replace the record keyed by `record.id`.
    ///
    /// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
    /// The rename is the only visible mutation, so an interrupted write leaves
    /// the previous record (or no record) in place.
    pub fn upsert(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        let path = profile_path_at(&self.home, &record.id)?;
        ensure_private_dir(&profiles_dir_at(&self.home))?;
        write_yaml_atomic(&path, record)
    }

    /// Every cached record, sorted by id.
    pub fn list(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        let dir = profiles_dir_at(&self.home);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("yaml"))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            records.push(read_yaml::<ProfileRecord>(&path)?);
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Shared file helpers (session and config use the same protocol)
// ---------------------------------------------------------------------------

/// The user's home directory, from `dirs::home_dir()`.
pub fn home_dir() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

pub(crate) fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `.tmp` sibling in the same directory as the target (same filesystem, so
/// `rename` stays atomic).
pub(crate) fn write_yaml_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let yaml = serde_yaml::to_string(value)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Creates the directory (mode `0700`) if it does not yet exist.
pub(crate) fn ensure_private_dir(dir: &Path) -> Result<(), StoreError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        set_dir_permissions(dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
