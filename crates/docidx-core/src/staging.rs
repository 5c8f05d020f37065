//! All-or-nothing replacement of build destinations.
//!
//! A build writes into a hidden sibling of its destination and only swaps it
//! into place once the artifact is complete. A failed or interrupted build
//! leaves the previous artifact (or nothing) behind, never a half-written one.
//! Sibling placement keeps the final `rename` on one filesystem.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

use crate::error::{Error, Result};

fn parent_of(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_name_of(dest: &Path) -> Result<String> {
    dest.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidConfig(format!("destination has no file name: {}", dest.display())))
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| Error::io(path, e))?;
    Ok(entries.next().is_none())
}

/// A directory being built beside its final destination.
#[derive(Debug)]
pub struct StagedDir {
    dest: PathBuf,
    staging: TempDir,
}

impl StagedDir {
    /// Creates the staging directory next to `dest`.
    ///
    /// An existing `dest` must be an empty directory or satisfy
    /// `is_replaceable`; anything else is `DestinationOccupied`. Both checks
    /// run before anything is written, so an unwritable parent or an occupied
    /// destination fails without side effects on `dest`.
    pub fn prepare<F>(dest: &Path, is_replaceable: F) -> Result<Self>
    where
        F: Fn(&Path) -> bool,
    {
        if dest.exists() {
            let replaceable = dest.is_dir() && (is_empty_dir(dest)? || is_replaceable(dest));
            if !replaceable {
                return Err(Error::DestinationOccupied { path: dest.to_path_buf() });
            }
        }
        let parent = parent_of(dest);
        fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}.staging-", file_name_of(dest)?))
            .tempdir_in(&parent)
            .map_err(|e| Error::io(&parent, e))?;
        tracing::debug!(staging = %staging.path().display(), dest = %dest.display(), "staging directory ready");
        Ok(Self { dest: dest.to_path_buf(), staging })
    }

    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Swaps the staged directory into place and removes what it replaced.
    pub fn commit(self) -> Result<PathBuf> {
        let Self { dest, staging } = self;
        let parent = parent_of(&dest);

        let backup = if dest.exists() {
            let name = file_name_of(&dest)?;
            let slot = tempfile::Builder::new()
                .prefix(&format!(".{}.old-", name))
                .tempdir_in(&parent)
                .map_err(|e| Error::io(&parent, e))?
                .keep();
            fs::remove_dir(&slot).map_err(|e| Error::io(&slot, e))?;
            fs::rename(&dest, &slot).map_err(|e| Error::io(&dest, e))?;
            Some(slot)
        } else {
            None
        };

        let staged = staging.keep();
        if let Err(e) = fs::rename(&staged, &dest) {
            if let Some(backup) = &backup {
                if let Err(restore) = fs::rename(backup, &dest) {
                    tracing::error!(backup = %backup.display(), error = %restore, "could not restore previous destination");
                }
            }
            let _ = fs::remove_dir_all(&staged);
            return Err(Error::io(&dest, e));
        }

        if let Some(backup) = backup {
            if let Err(e) = fs::remove_dir_all(&backup) {
                tracing::warn!(path = %backup.display(), error = %e, "could not remove replaced destination");
            }
        }
        Ok(dest)
    }
}

/// A file written beside its destination and renamed over it on commit.
#[derive(Debug)]
pub struct StagedFile {
    dest: PathBuf,
    file: NamedTempFile,
}

impl StagedFile {
    pub fn prepare(dest: &Path) -> Result<Self> {
        if dest.is_dir() {
            return Err(Error::DestinationOccupied { path: dest.to_path_buf() });
        }
        let parent = parent_of(dest);
        fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;
        let file = tempfile::Builder::new()
            .prefix(&format!(".{}.staging-", file_name_of(dest)?))
            .tempfile_in(&parent)
            .map_err(|e| Error::io(&parent, e))?;
        Ok(Self { dest: dest.to_path_buf(), file })
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.write_all(bytes).map_err(|e| Error::io(&path, e))?;
        self.file.as_file().sync_all().map_err(|e| Error::io(path, e))
    }

    pub fn commit(self) -> Result<PathBuf> {
        let Self { dest, file } = self;
        file.persist(&dest).map_err(|e| Error::io(&dest, e.error))?;
        Ok(dest)
    }
}
