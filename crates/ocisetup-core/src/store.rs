//! Config file persistence
//!
//! A rerun supersedes the previous record, so every overwrite must be
//! preceded by [`ConfigStore::backup`]. Writes go through a temporary file in
//! the same directory and a rename, so readers never see a half-written file.

use crate::error::{ProvisionError, Result};
use crate::record::ConfigRecord;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Timestamp suffix resolution is one second; a second backup taken within
/// the same second replaces the first.
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Outcome of [`ConfigStore::backup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupHandle {
    /// The previous file was copied here
    Created(PathBuf),
    /// Nothing existed at the config path
    Skipped,
}

impl BackupHandle {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Created(path) => Some(path),
            Self::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Read the record at `path`, `None` if there is no file.
    pub fn load(&self, path: &Path) -> Result<Option<ConfigRecord>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProvisionError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        ConfigRecord::parse(&content)
            .map(Some)
            .map_err(|e| ProvisionError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Path a backup taken at `now` would be written to.
    pub fn backup_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".backup.{}", now.format(BACKUP_TIMESTAMP_FORMAT)));
        PathBuf::from(name)
    }

    /// Copy the current file aside before it gets overwritten.
    pub fn backup(&self, path: &Path) -> Result<BackupHandle> {
        self.backup_at(path, Utc::now())
    }

    pub fn backup_at(&self, path: &Path, now: DateTime<Utc>) -> Result<BackupHandle> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no existing config, skipping backup");
            return Ok(BackupHandle::Skipped);
        }

        let backup = Self::backup_path(path, now);
        fs::copy(path, &backup).map_err(|source| ProvisionError::Persist {
            path: backup.clone(),
            source,
        })?;
        set_owner_only(&backup).map_err(|source| ProvisionError::Persist {
            path: backup.clone(),
            source,
        })?;

        tracing::info!(backup = %backup.display(), "backed up existing config");
        Ok(BackupHandle::Created(backup))
    }

    /// Replace whatever is at `path` with `record`, readable by the owner only.
    pub fn write(&self, record: &ConfigRecord, path: &Path) -> Result<()> {
        self.write_atomic(record, path)
            .map_err(|source| ProvisionError::Persist {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(path = %path.display(), "wrote config");
        Ok(())
    }

    fn write_atomic(&self, record: &ConfigRecord, path: &Path) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        // NamedTempFile is created 0600 on unix
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(record.to_config_string().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        set_owner_only(path)
    }
}

fn set_owner_only(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
